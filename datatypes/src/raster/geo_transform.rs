use crate::error::{self, Error};
use crate::primitives::{BoundingBox2D, Coordinate2D};
use serde::{Deserialize, Serialize};
use snafu::ensure;

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
/// It only covers axis-aligned grids: the shear/rotation terms of the GDAL matrix are always zero.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_coordinate: Coordinate2D,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
}

impl GeoTransform {
    /// Generates a new `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new((0.0, 0.0).into(), 1.0, -1.0);
    /// ```
    ///
    pub fn new(origin_coordinate: Coordinate2D, x_pixel_size: f64, y_pixel_size: f64) -> Self {
        Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Generates a new `GeoTransform` with explicit x, y values of the upper left edge
    pub fn new_with_coordinate_x_y(
        origin_coordinate_x: f64,
        x_pixel_size: f64,
        origin_coordinate_y: f64,
        y_pixel_size: f64,
    ) -> Self {
        Self {
            origin_coordinate: (origin_coordinate_x, origin_coordinate_y).into(),
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Transforms a pixel position (column, row) into a SRS coordinate (x, y).
    /// Positions are pixel edges, so `(width, height)` maps onto the far corner of the raster.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(5.0, 1.0, 5.0, -1.0);
    /// assert_eq!(geo_transform.pixel_to_coordinate_2d(2, 2), (7.0, 3.0).into());
    /// ```
    ///
    pub fn pixel_to_coordinate_2d(&self, column: usize, row: usize) -> Coordinate2D {
        let coord_x = self.origin_coordinate.x + (column as f64) * self.x_pixel_size;
        let coord_y = self.origin_coordinate.y + (row as f64) * self.y_pixel_size;
        Coordinate2D::new(coord_x, coord_y)
    }

    /// The footprint of the pixel window starting at (`x_offset`, `y_offset`) with the given size.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterlite_datatypes::raster::GeoTransform;
    /// use rasterlite_datatypes::primitives::BoundingBox2D;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// assert_eq!(
    ///     geo_transform.window_bounds(256, 0, 88, 256),
    ///     BoundingBox2D::new((256.0, -256.0).into(), (344.0, 0.0).into()).unwrap()
    /// );
    /// ```
    ///
    pub fn window_bounds(
        &self,
        x_offset: usize,
        y_offset: usize,
        width: usize,
        height: usize,
    ) -> BoundingBox2D {
        BoundingBox2D::from_corners(
            self.pixel_to_coordinate_2d(x_offset, y_offset),
            self.pixel_to_coordinate_2d(x_offset + width, y_offset + height),
        )
    }

    /// The footprint of a whole raster of `width` x `height` pixels.
    pub fn raster_bounds(&self, width: usize, height: usize) -> BoundingBox2D {
        self.window_bounds(0, 0, width, height)
    }

    /// Ground size of one pixel per axis, without the direction of the axis.
    pub fn absolute_pixel_size(&self) -> (f64, f64) {
        (self.x_pixel_size.abs(), self.y_pixel_size.abs())
    }
}

impl Default for GeoTransform {
    /// The identity transform: origin at (0, 0), pixel size 1, north-up.
    fn default() -> Self {
        GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0)
    }
}

impl TryFrom<GdalGeoTransform> for GeoTransform {
    type Error = Error;

    fn try_from(gdal_geo_transform: GdalGeoTransform) -> Result<Self, Self::Error> {
        ensure!(
            gdal_geo_transform[2] == 0.0 && gdal_geo_transform[4] == 0.0,
            error::RotatedGeoTransform {
                geo_transform: gdal_geo_transform
            }
        );

        let x_pixel_size = gdal_geo_transform[1];
        let y_pixel_size = gdal_geo_transform[5];
        ensure!(
            x_pixel_size.is_finite()
                && y_pixel_size.is_finite()
                && x_pixel_size != 0.0
                && y_pixel_size != 0.0,
            error::InvalidPixelSize {
                x_pixel_size,
                y_pixel_size
            }
        );

        Ok(Self::new_with_coordinate_x_y(
            gdal_geo_transform[0],
            x_pixel_size,
            gdal_geo_transform[3],
            y_pixel_size,
        ))
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            0.0, // self.x_rotation,
            geo_transform.origin_coordinate.y,
            0.0, // self.y_rotation,
            geo_transform.y_pixel_size,
        ]
    }
}
