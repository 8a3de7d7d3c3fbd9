use std::fmt;

use rasterlite_datatypes::raster::{BlockLattice, BlockSize, DEFAULT_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use tracing::warn;

use crate::error::{self, Error};
use crate::util::Result;

/// The GDAL driver that encodes the tiles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TileDriver {
    #[default]
    GTiff,
    Jpeg,
    Png,
    Webp,
    /// in-memory rasters, cannot produce a tile blob
    Mem,
    /// virtual rasters, cannot produce a tile blob
    Vrt,
    Other(String),
}

impl TileDriver {
    /// The short name GDAL registers the driver under
    pub fn gdal_name(&self) -> &str {
        match self {
            TileDriver::GTiff => "GTiff",
            TileDriver::Jpeg => "JPEG",
            TileDriver::Png => "PNG",
            TileDriver::Webp => "WEBP",
            TileDriver::Mem => "MEM",
            TileDriver::Vrt => "VRT",
            TileDriver::Other(name) => name,
        }
    }

    /// `false` for drivers that only describe data in memory or by reference
    pub fn is_durable(&self) -> bool {
        !matches!(self, TileDriver::Mem | TileDriver::Vrt)
    }
}

impl From<&str> for TileDriver {
    fn from(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "GTIFF" => TileDriver::GTiff,
            "JPEG" => TileDriver::Jpeg,
            "PNG" => TileDriver::Png,
            "WEBP" => TileDriver::Webp,
            "MEM" => TileDriver::Mem,
            "VRT" => TileDriver::Vrt,
            _ => TileDriver::Other(name.to_string()),
        }
    }
}

impl From<String> for TileDriver {
    fn from(name: String) -> Self {
        TileDriver::from(name.as_str())
    }
}

impl From<TileDriver> for String {
    fn from(driver: TileDriver) -> Self {
        driver.gdal_name().to_string()
    }
}

impl fmt::Display for TileDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gdal_name())
    }
}

/// Options of a create-copy run.
///
/// The keys accepted by [`CreateCopyOptions::merge_key_value_pairs`] are
/// `DRIVER`, `TILED`, `BLOCKXSIZE`, `BLOCKYSIZE`, `QUALITY`, `COMPRESS`, `PHOTOMETRIC` and `WIPE`, in any case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCopyOptions {
    pub driver: TileDriver,
    pub tiled: bool,
    pub block_x_size: usize,
    pub block_y_size: usize,
    pub quality: Option<u8>,
    pub compress: Option<String>,
    pub photometric: Option<String>,
    pub wipe: bool,
}

impl Default for CreateCopyOptions {
    fn default() -> Self {
        Self {
            driver: TileDriver::default(),
            tiled: true,
            block_x_size: DEFAULT_BLOCK_SIZE,
            block_y_size: DEFAULT_BLOCK_SIZE,
            quality: None,
            compress: None,
            photometric: None,
            wipe: false,
        }
    }
}

impl CreateCopyOptions {
    pub fn from_key_value_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        options.merge_key_value_pairs(pairs)?;
        Ok(options)
    }

    /// Overrides the options named in `pairs`. Unknown keys are ignored with a warning.
    pub fn merge_key_value_pairs<I, K, V>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());

            match key.to_ascii_uppercase().as_str() {
                "DRIVER" => self.driver = TileDriver::from(value),
                "TILED" => self.tiled = test_bool(value),
                "BLOCKXSIZE" => self.block_x_size = parse_block_size(key, value)?,
                "BLOCKYSIZE" => self.block_y_size = parse_block_size(key, value)?,
                "QUALITY" => self.quality = Some(parse_quality(key, value)?),
                "COMPRESS" => self.compress = Some(value.to_string()),
                "PHOTOMETRIC" => self.photometric = Some(value.to_string()),
                "WIPE" => self.wipe = test_bool(value),
                _ => warn!("Ignoring unknown creation option {key}={value}"),
            }
        }

        Ok(())
    }

    /// Checks the values that do not come from `KEY=VALUE` pairs, e.g. those read from settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(quality) = self.quality {
            check_quality("QUALITY", &quality.to_string(), quality)?;
        }
        Ok(())
    }

    /// The blocks of a raster of the given size: one block if untiled, clamped blocks otherwise.
    pub fn lattice(&self, raster_width: usize, raster_height: usize) -> Result<BlockLattice> {
        let lattice = if self.tiled {
            BlockLattice::new(
                raster_width,
                raster_height,
                BlockSize::clamped(self.block_x_size, self.block_y_size),
            )?
        } else {
            BlockLattice::single_block(raster_width, raster_height)?
        };
        Ok(lattice)
    }
}

/// Splits `KEY=VALUE`
pub fn parse_key_value_pair(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::MalformedOption {
            input: input.to_string(),
        }),
    }
}

/// GDAL's notion of a boolean option: everything except `NO`, `FALSE`, `OFF` and `0` is true.
pub fn test_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "NO" | "FALSE" | "OFF" | "0"
    )
}

fn parse_block_size(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| Error::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_quality(key: &str, value: &str) -> Result<u8> {
    let quality = value
        .trim()
        .parse::<u8>()
        .map_err(|e| Error::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    check_quality(key, value, quality)?;

    Ok(quality)
}

fn check_quality(key: &str, value: &str, quality: u8) -> Result<()> {
    ensure!(
        (1..=100).contains(&quality),
        error::InvalidOption {
            key,
            value,
            reason: "quality must be between 1 and 100",
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let options = CreateCopyOptions::from_key_value_pairs(Vec::<(&str, &str)>::new()).unwrap();

        assert_eq!(options, CreateCopyOptions::default());
        assert_eq!(options.driver, TileDriver::GTiff);
        assert!(options.tiled);
        assert!(!options.wipe);
        assert_eq!(options.lattice(1000, 1000).unwrap().block_size(), BlockSize::new(256, 256));
    }

    #[test]
    fn case_insensitive_keys() {
        let options = CreateCopyOptions::from_key_value_pairs([
            ("driver", "jpeg"),
            ("BlockXSize", "512"),
            ("blockysize", "128"),
            ("Quality", "75"),
            ("wipe", "yes"),
        ])
        .unwrap();

        assert_eq!(
            options,
            CreateCopyOptions {
                driver: TileDriver::Jpeg,
                tiled: true,
                block_x_size: 512,
                block_y_size: 128,
                quality: Some(75),
                compress: None,
                photometric: None,
                wipe: true,
            }
        );
    }

    #[test]
    fn block_sizes_are_clamped() {
        let options =
            CreateCopyOptions::from_key_value_pairs([("BLOCKXSIZE", "8"), ("BLOCKYSIZE", "9000")])
                .unwrap();

        assert_eq!(options.lattice(100, 100).unwrap().block_size(), BlockSize::new(64, 4096));
    }

    #[test]
    fn untiled_covers_raster() {
        let options = CreateCopyOptions::from_key_value_pairs([("TILED", "NO")]).unwrap();

        let lattice = options.lattice(1000, 800).unwrap();

        assert_eq!(lattice.number_of_blocks(), 1);
        assert_eq!(lattice.block_size(), BlockSize::new(1000, 800));
        assert!(options.lattice(0, 800).is_err());
    }

    #[test]
    fn truth_values() {
        for value in ["NO", "false", "Off", "0", " no "] {
            assert!(!test_bool(value), "{value}");
        }
        for value in ["YES", "true", "ON", "1", "anything"] {
            assert!(test_bool(value), "{value}");
        }
    }

    #[test]
    fn rejects_invalid_numbers() {
        assert!(matches!(
            CreateCopyOptions::from_key_value_pairs([("BLOCKXSIZE", "large")]),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(
            CreateCopyOptions::from_key_value_pairs([("BLOCKYSIZE", "-5")]),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(
            CreateCopyOptions::from_key_value_pairs([("QUALITY", "0")]),
            Err(Error::InvalidOption { .. })
        ));
        assert!(matches!(
            CreateCopyOptions::from_key_value_pairs([("QUALITY", "101")]),
            Err(Error::InvalidOption { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let options =
            CreateCopyOptions::from_key_value_pairs([("INTERLEAVE", "PIXEL"), ("WIPE", "YES")])
                .unwrap();

        assert!(options.wipe);
    }

    #[test]
    fn merge_overrides_settings() {
        let mut options = CreateCopyOptions {
            driver: TileDriver::Png,
            wipe: true,
            ..CreateCopyOptions::default()
        };

        options
            .merge_key_value_pairs([("WIPE", "NO"), ("COMPRESS", "DEFLATE")])
            .unwrap();

        assert_eq!(options.driver, TileDriver::Png);
        assert!(!options.wipe);
        assert_eq!(options.compress.as_deref(), Some("DEFLATE"));
    }

    #[test]
    fn driver_names() {
        assert_eq!(TileDriver::from("gtiff"), TileDriver::GTiff);
        assert_eq!(TileDriver::from("WebP"), TileDriver::Webp);
        assert_eq!(TileDriver::from("vrt"), TileDriver::Vrt);
        assert_eq!(
            TileDriver::from("JP2OpenJPEG"),
            TileDriver::Other("JP2OpenJPEG".to_string())
        );
        assert_eq!(TileDriver::Jpeg.to_string(), "JPEG");
        assert!(!TileDriver::Mem.is_durable());
        assert!(!TileDriver::Vrt.is_durable());
        assert!(TileDriver::Png.is_durable());
    }

    #[test]
    fn deserialize_from_settings() {
        let options: CreateCopyOptions =
            serde_json::from_str(r#"{"driver": "png", "block_x_size": 512, "wipe": true}"#)
                .unwrap();

        assert_eq!(options.driver, TileDriver::Png);
        assert_eq!(options.block_x_size, 512);
        assert_eq!(options.block_y_size, 256);
        assert!(options.tiled);
        assert!(options.wipe);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn settings_quality_is_validated() {
        let options: CreateCopyOptions = serde_json::from_str(r#"{"quality": 0}"#).unwrap();

        assert!(matches!(
            options.validate(),
            Err(Error::InvalidOption { key, .. }) if key == "QUALITY"
        ));

        let options: CreateCopyOptions = serde_json::from_str(r#"{"quality": 90}"#).unwrap();
        assert!(options.validate().is_ok());
    }

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value_pair("QUALITY=80").unwrap(),
            ("QUALITY".to_string(), "80".to_string())
        );
        assert_eq!(
            parse_key_value_pair("COMPRESS=").unwrap(),
            ("COMPRESS".to_string(), String::new())
        );
        assert!(parse_key_value_pair("QUALITY").is_err());
        assert!(parse_key_value_pair("=80").is_err());
    }
}
