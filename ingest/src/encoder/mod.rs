//! Turning a block of pixels into the bytes of a standalone raster file.

use rasterlite_datatypes::raster::RasterDataType;
use snafu::ensure;
use tracing::warn;

use crate::error;
use crate::options::{CreateCopyOptions, TileDriver};
use crate::util::Result;

mod gdal;

pub use self::gdal::GdalTileEncoder;

/// The pixels of one tile, band-sequential: all rows of band 1, then all rows of band 2 and so on.
#[derive(Debug, Clone, Copy)]
pub struct TileBuffer<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    band_count: usize,
    data_type: RasterDataType,
}

impl<'a> TileBuffer<'a> {
    /// # Errors
    ///
    /// Fails if `data` does not hold exactly `width * height * band_count` pixels of `data_type`
    ///
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        band_count: usize,
        data_type: RasterDataType,
    ) -> Result<Self> {
        ensure!(
            width > 0
                && height > 0
                && band_count > 0
                && data.len() == width * height * band_count * data_type.size_in_bytes(),
            error::TileBufferSize {
                width,
                height,
                band_count,
                data_type,
                actual: data.len(),
            }
        );

        Ok(Self {
            data,
            width,
            height,
            band_count,
            data_type,
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn data_type(&self) -> RasterDataType {
        self.data_type
    }

    /// The bytes of each band, in band order
    pub fn bands(&self) -> impl Iterator<Item = &'a [u8]> {
        let band_len = self.width * self.height * self.data_type.size_in_bytes();
        self.data.chunks_exact(band_len)
    }
}

/// Encodes tiles into self-contained files of some raster format
pub trait TileEncoder {
    fn encode(&self, tile: &TileBuffer<'_>) -> Result<Vec<u8>>;

    /// Name of the format, for log messages
    fn format_name(&self) -> &str;
}

/// The creation options handed to the encoding driver, derived from the run options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodecOptions {
    entries: Vec<(String, String)>,
}

impl CodecOptions {
    /// Forwards the run options `driver` understands and warns about the rest.
    ///
    /// `QUALITY` is `JPEG_QUALITY` for GeoTIFF and `QUALITY` for JPEG and WEBP.
    /// `COMPRESS` and `PHOTOMETRIC` only apply to GeoTIFF.
    pub fn for_driver(driver: &TileDriver, options: &CreateCopyOptions) -> Self {
        let mut codec_options = Self::default();

        if let Some(quality) = options.quality {
            match driver {
                TileDriver::GTiff => codec_options.push("JPEG_QUALITY", quality.to_string()),
                TileDriver::Jpeg | TileDriver::Webp => {
                    codec_options.push("QUALITY", quality.to_string());
                }
                _ => unexpected_option("QUALITY", driver),
            }
        }

        for (key, value) in [
            ("COMPRESS", &options.compress),
            ("PHOTOMETRIC", &options.photometric),
        ] {
            let Some(value) = value else { continue };

            if *driver == TileDriver::GTiff {
                codec_options.push(key, value.clone());
            } else {
                unexpected_option(key, driver);
            }
        }

        codec_options
    }

    fn push(&mut self, key: &str, value: String) {
        self.entries.push((key.to_string(), value));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unexpected_option(key: &str, driver: &TileDriver) {
    warn!("Unexpected option '{key}' for driver '{driver}'");
}
