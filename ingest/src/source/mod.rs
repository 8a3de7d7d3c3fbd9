//! Rasters that can be copied into a tile store.

use rasterlite_datatypes::raster::{GdalGeoTransform, RasterDataType};
use snafu::ensure;

use crate::error;
use crate::util::Result;

mod gdal;
mod memory;

pub use self::gdal::GdalSourceRaster;
pub use self::memory::MemoryRaster;

/// A readable raster with a fixed size, band count and pixel type
pub trait SourceRaster {
    /// Free-form name of the raster, stored as the source name of every tile
    fn description(&self) -> String;

    /// `(width, height)` in pixels
    fn size(&self) -> (usize, usize);

    fn band_count(&self) -> usize;

    /// The pixel type of all bands
    fn data_type(&self) -> RasterDataType;

    /// The affine transform from pixel to world coordinates, if the raster is georeferenced
    fn geo_transform(&self) -> Option<GdalGeoTransform>;

    /// The spatial reference as WKT, if known
    fn projection_wkt(&self) -> Option<String>;

    /// Reads the window into `buffer`, band-sequential, all bands.
    /// `buffer` must hold exactly `width * height * band_count` pixels.
    fn read_window(
        &self,
        x_offset: usize,
        y_offset: usize,
        width: usize,
        height: usize,
        buffer: &mut [u8],
    ) -> Result<()>;

    /// Size in bytes of a window of `width` x `height` pixels over all bands
    fn window_len(&self, width: usize, height: usize) -> usize {
        width * height * self.band_count() * self.data_type().size_in_bytes()
    }
}

/// Checks that a window lies within the raster and `buffer_len` fits it
pub(crate) fn check_window(
    raster: &dyn SourceRaster,
    x_offset: usize,
    y_offset: usize,
    width: usize,
    height: usize,
    buffer_len: usize,
) -> Result<()> {
    let (raster_width, raster_height) = raster.size();

    ensure!(
        width > 0
            && height > 0
            && x_offset + width <= raster_width
            && y_offset + height <= raster_height,
        error::WindowOutOfBounds {
            x_offset,
            y_offset,
            width,
            height,
            raster_width,
            raster_height,
        }
    );

    ensure!(
        buffer_len == raster.window_len(width, height),
        error::TileBufferSize {
            width,
            height,
            band_count: raster.band_count(),
            data_type: raster.data_type(),
            actual: buffer_len,
        }
    );

    Ok(())
}
