use snafu::Snafu;

use crate::primitives::Coordinate2D;
use crate::raster::GdalGeoTransform;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display(
        "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:{} ur:{}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    },

    #[snafu(display("Cannot use geotransform with rotational terms: {geo_transform:?}"))]
    RotatedGeoTransform { geo_transform: GdalGeoTransform },

    #[snafu(display("Pixel sizes must be finite and non-zero, found x: {x_pixel_size}, y: {y_pixel_size}"))]
    InvalidPixelSize { x_pixel_size: f64, y_pixel_size: f64 },

    #[snafu(display(
        "Invalid block geometry: raster of {width}x{height} pixels cannot be split into blocks of {block_width}x{block_height}"
    ))]
    InvalidBlockGeometry {
        width: usize,
        height: usize,
        block_width: usize,
        block_height: usize,
    },

    #[snafu(display("InvalidSpatialReferenceString: {}", spatial_reference_string))]
    InvalidSpatialReferenceString { spatial_reference_string: String },

    #[snafu(display("ParseU32: {}", source))]
    ParseU32 {
        source: <u32 as std::str::FromStr>::Err,
    },

    #[snafu(display("Unsupported GDAL data type: {gdal_data_type}"))]
    UnsupportedGdalDataType { gdal_data_type: u32 },

    #[snafu(display("Gdal error: {source}"))]
    Gdal { source: gdal::errors::GdalError },
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}
