use std::ffi::{c_int, CString};
use std::fmt;
use std::marker::PhantomData;

use gdal::cpl::CslStringList;
use gdal::errors::GdalError;
use gdal::{Dataset, Driver, DriverManager};
use gdal_sys::CPLErr;
use rasterlite_datatypes::util::gdal::last_gdal_error;
use snafu::{ensure, ResultExt};
use tracing::debug;

use super::{CodecOptions, TileBuffer, TileEncoder};
use crate::error::{self, Error};
use crate::options::CreateCopyOptions;
use crate::util::Result;

/// Encodes tiles with a GDAL driver: the pixels are exposed as an in-memory dataset,
/// copied into a `/vsimem/` file by the target driver and read back as bytes.
pub struct GdalTileEncoder {
    driver: Driver,
    driver_name: String,
    memory_driver: Driver,
    creation_options: CslStringList,
    /// `/vsimem/` directory holding the files of tiles being encoded
    scratch_dir: String,
}

impl GdalTileEncoder {
    /// # Errors
    ///
    /// Fails if the configured driver only describes data by reference or is not available
    ///
    pub fn new(options: &CreateCopyOptions) -> Result<Self> {
        let driver_name = options.driver.gdal_name();

        ensure!(
            options.driver.is_durable(),
            error::DisallowedTileDriver {
                driver: driver_name,
            }
        );

        let driver = DriverManager::get_driver_by_name(driver_name).context(
            error::UnknownTileDriver {
                driver: driver_name,
            },
        )?;
        let memory_driver = DriverManager::get_driver_by_name("MEM")?;

        let mut creation_options = CslStringList::new();
        for (key, value) in CodecOptions::for_driver(&options.driver, options).entries() {
            creation_options.set_name_value(key, value)?;
        }

        debug!(
            "Encoding tiles with GDAL driver {} ({creation_options:?})",
            driver.short_name()
        );

        Ok(Self {
            driver_name: driver.short_name(),
            driver,
            memory_driver,
            creation_options,
            scratch_dir: format!("/vsimem/rasterlite_{}", uuid::Uuid::new_v4()),
        })
    }

    fn encode_error(&self, source: GdalError) -> Error {
        Error::Encode {
            driver: self.driver_name.clone(),
            source,
        }
    }

    /// A MEM dataset whose bands point into the band slices of `tile`
    fn alias_tile<'a>(&self, tile: &TileBuffer<'a>) -> Result<TileDataset<'a>> {
        let gdal_data_type = tile.data_type().gdal_data_type();
        let pixel_offset = tile.data_type().size_in_bytes();
        let line_offset = tile.width() * pixel_offset;

        let c_dataset = unsafe {
            gdal_sys::GDALCreate(
                self.memory_driver.c_driver(),
                c"".as_ptr(),
                tile.width() as c_int,
                tile.height() as c_int,
                0,
                gdal_data_type,
                std::ptr::null_mut(),
            )
        };
        if c_dataset.is_null() {
            return Err(self.encode_error(last_gdal_error("GDALCreate")));
        }
        let dataset = unsafe { Dataset::from_c_dataset(c_dataset) };

        for pixels in tile.bands() {
            let mut band_options = CslStringList::new();
            band_options.set_name_value("DATAPOINTER", &format!("{:p}", pixels.as_ptr()))?;
            band_options.set_name_value("PIXELOFFSET", &pixel_offset.to_string())?;
            band_options.set_name_value("LINEOFFSET", &line_offset.to_string())?;

            let rv = unsafe {
                gdal_sys::GDALAddBand(c_dataset, gdal_data_type, band_options.as_ptr() as _)
            };
            if rv != CPLErr::CE_None {
                return Err(self.encode_error(last_gdal_error("GDALAddBand")));
            }
        }

        Ok(TileDataset {
            dataset,
            pixels: PhantomData,
        })
    }
}

impl TileEncoder for GdalTileEncoder {
    fn encode(&self, tile: &TileBuffer<'_>) -> Result<Vec<u8>> {
        let tile_dataset = self.alias_tile(tile)?;

        let output = MemoryFile::new(&self.scratch_dir);
        let c_path = CString::new(output.path.as_str())
            .map_err(|e| self.encode_error(GdalError::from(e)))?;

        let c_output = unsafe {
            gdal_sys::GDALCreateCopy(
                self.driver.c_driver(),
                c_path.as_ptr(),
                tile_dataset.dataset.c_dataset(),
                0,
                self.creation_options.as_ptr() as _,
                None,
                std::ptr::null_mut(),
            )
        };
        if c_output.is_null() {
            return Err(self.encode_error(last_gdal_error("GDALCreateCopy")));
        }

        // the file is only complete once the output dataset is closed
        drop(unsafe { Dataset::from_c_dataset(c_output) });
        drop(tile_dataset);

        gdal::vsi::get_vsi_mem_file_bytes_owned(&output.path).map_err(|e| self.encode_error(e))
    }

    fn format_name(&self) -> &str {
        &self.driver_name
    }
}

impl fmt::Debug for GdalTileEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GdalTileEncoder")
            .field("driver", &self.driver_name)
            .field("creation_options", &self.creation_options)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

/// A MEM dataset without pixel storage of its own, valid as long as the tile's pixels are borrowed
struct TileDataset<'a> {
    dataset: Dataset,
    pixels: PhantomData<&'a [u8]>,
}

/// A `/vsimem/` file that is removed together with its sidecar when dropped
struct MemoryFile {
    path: String,
}

impl MemoryFile {
    fn new(dir: &str) -> Self {
        Self {
            path: format!("{dir}/tile_{}", uuid::Uuid::new_v4()),
        }
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        for path in [self.path.clone(), format!("{}.aux.xml", self.path)] {
            if let Ok(c_path) = CString::new(path) {
                unsafe {
                    gdal_sys::VSIUnlink(c_path.as_ptr());
                }
            }
        }
    }
}
