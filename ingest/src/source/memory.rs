use rasterlite_datatypes::raster::{GdalGeoTransform, RasterDataType};
use snafu::ensure;

use super::{check_window, SourceRaster};
use crate::error;
use crate::util::Result;

/// A raster held in memory, band-sequential
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    band_count: usize,
    data_type: RasterDataType,
    data: Vec<u8>,
    geo_transform: Option<GdalGeoTransform>,
    projection_wkt: Option<String>,
    description: String,
}

impl MemoryRaster {
    /// # Errors
    ///
    /// Fails if `data` does not hold `width * height * band_count` pixels of `data_type`
    ///
    pub fn new(
        width: usize,
        height: usize,
        band_count: usize,
        data_type: RasterDataType,
        data: Vec<u8>,
    ) -> Result<Self> {
        ensure!(
            data.len() == width * height * band_count * data_type.size_in_bytes(),
            error::TileBufferSize {
                width,
                height,
                band_count,
                data_type,
                actual: data.len(),
            }
        );

        Ok(Self {
            width,
            height,
            band_count,
            data_type,
            data,
            geo_transform: None,
            projection_wkt: None,
            description: String::new(),
        })
    }

    /// A single-band byte raster where each pixel is filled by `pixel(column, row)`
    pub fn from_fn<F>(width: usize, height: usize, mut pixel: F) -> Self
    where
        F: FnMut(usize, usize) -> u8,
    {
        let data = (0..height)
            .flat_map(|row| (0..width).map(move |column| (column, row)))
            .map(|(column, row)| pixel(column, row))
            .collect();

        Self {
            width,
            height,
            band_count: 1,
            data_type: RasterDataType::U8,
            data,
            geo_transform: None,
            projection_wkt: None,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_geo_transform(mut self, geo_transform: GdalGeoTransform) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    #[must_use]
    pub fn with_projection(mut self, projection_wkt: impl Into<String>) -> Self {
        self.projection_wkt = Some(projection_wkt.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn band_len(&self) -> usize {
        self.width * self.height * self.data_type.size_in_bytes()
    }
}

impl SourceRaster for MemoryRaster {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn band_count(&self) -> usize {
        self.band_count
    }

    fn data_type(&self) -> RasterDataType {
        self.data_type
    }

    fn geo_transform(&self) -> Option<GdalGeoTransform> {
        self.geo_transform
    }

    fn projection_wkt(&self) -> Option<String> {
        self.projection_wkt.clone()
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

        let pixel_size = self.data_type.size_in_bytes();
        let row_len = width * pixel_size;
        let mut target = buffer.chunks_exact_mut(row_len);

        for band in 0..self.band_count {
            let band_start = band * self.band_len();

            for row in y_offset..y_offset + height {
                let start = band_start + (row * self.width + x_offset) * pixel_size;
                if let Some(target_row) = target.next() {
                    target_row.copy_from_slice(&self.data[start..start + row_len]);
                }
            }
        }

        Ok(())
    }
}
