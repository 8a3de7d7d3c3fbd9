use std::ffi::{c_int, c_void};
use std::path::Path;

use gdal::{Dataset, Metadata};
use gdal_sys::{CPLErr, GDALRWFlag};
use rasterlite_datatypes::raster::{GdalGeoTransform, RasterDataType};
use rasterlite_datatypes::util::gdal::{gdal_open_dataset, last_gdal_error};
use snafu::ensure;
use tracing::debug;

use super::{check_window, SourceRaster};
use crate::error::{self, Error};
use crate::util::Result;

/// A raster file readable by GDAL
#[derive(Debug)]
pub struct GdalSourceRaster {
    dataset: Dataset,
    data_type: RasterDataType,
}

impl GdalSourceRaster {
    pub fn open(path: &Path) -> Result<Self> {
        let dataset = gdal_open_dataset(path)?;
        debug!("Opened source raster {}", path.display());
        Self::from_dataset(dataset)
    }

    /// # Errors
    ///
    /// Fails if the dataset has no bands or its pixel type cannot be stored in a tile
    ///
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        ensure!(dataset.raster_count() > 0, error::NoBands);

        let data_type = RasterDataType::from_gdal_data_type(dataset.rasterband(1)?.band_type() as gdal_sys::GDALDataType::Type)?;

        Ok(Self { dataset, data_type })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl SourceRaster for GdalSourceRaster {
    fn description(&self) -> String {
        self.dataset.description().unwrap_or_default()
    }

    fn size(&self) -> (usize, usize) {
        self.dataset.raster_size()
    }

    fn band_count(&self) -> usize {
        self.dataset.raster_count() as usize
    }

    fn data_type(&self) -> RasterDataType {
        self.data_type
    }

    fn geo_transform(&self) -> Option<GdalGeoTransform> {
        self.dataset.geo_transform().ok()
    }

    fn projection_wkt(&self) -> Option<String> {
        Some(self.dataset.projection()).filter(|wkt| !wkt.is_empty())
    }

    fn read_window(
        &self,
        x_offset: usize,
        y_offset: usize,
        width: usize,
        height: usize,
        buffer: &mut [u8],
    ) -> Result<()> {
        check_window(self, x_offset, y_offset, width, height, buffer.len())?;

        let band_count = self.band_count() as c_int;
        let mut band_map: Vec<c_int> = (1..=band_count).collect();

        let rv = unsafe {
            gdal_sys::GDALDatasetRasterIO(
                self.dataset.c_dataset(),
                GDALRWFlag::GF_Read,
                x_offset as c_int,
                y_offset as c_int,
                width as c_int,
                height as c_int,
                buffer.as_mut_ptr().cast::<c_void>(),
                width as c_int,
                height as c_int,
                self.data_type.gdal_data_type(),
                band_count,
                band_map.as_mut_ptr(),
                0,
                0,
                0,
            )
        };

        if rv != CPLErr::CE_None {
            return Err(Error::ReadWindow {
                source_name: self.description(),
                source: last_gdal_error("GDALDatasetRasterIO"),
            });
        }

        Ok(())
    }
}
