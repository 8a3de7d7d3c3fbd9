use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("Source raster has no bands"))]
    NoBands,

    #[snafu(display("GDAL {driver} driver cannot be used as underlying driver"))]
    DisallowedTileDriver { driver: String },

    #[snafu(display("Cannot load GDAL {driver} driver: {source}"))]
    UnknownTileDriver {
        driver: String,
        source: gdal::errors::GdalError,
    },

    #[snafu(display(
        "Database {} already exists. Explicit table name must be specified",
        store_path.display()
    ))]
    AmbiguousTargetTable { store_path: PathBuf },

    #[snafu(display("Target specifier does not name a store file"))]
    EmptyTarget,

    #[snafu(display("Invalid value {value:?} for option {key}: {reason}"))]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },

    #[snafu(display("Expected an option of the form KEY=VALUE, found {input:?}"))]
    MalformedOption { input: String },

    #[snafu(display(
        "Store {} has no spatial metadata. Check that it was created as a tile store",
        store_path.display()
    ))]
    MissingSpatialMetadata { store_path: PathBuf },

    #[snafu(display("SRID {srid} is not registered in spatial_ref_sys"))]
    UnregisteredSrid { srid: i32 },

    #[snafu(display("Geometry column {table}.{column} is not registered in geometry_columns"))]
    UnregisteredGeometryColumn { table: String, column: String },

    #[snafu(display(
        "New data has not the same SRS as existing data (table {table} uses SRID {existing_srid}, new data uses SRID {srid})"
    ))]
    SridMismatch {
        table: String,
        existing_srid: i32,
        srid: i32,
    },

    #[snafu(display("Only one of the tables {rasters_table} and {metadata_table} exists"))]
    IncompleteSchema {
        rasters_table: String,
        metadata_table: String,
    },

    #[snafu(display("Cannot find metadata and/or raster tables for {prefix}"))]
    MissingTileTables { prefix: String },

    #[snafu(display(
        "Tile buffer of {actual} bytes does not hold {width}x{height}x{band_count} pixels of {data_type}"
    ))]
    TileBufferSize {
        width: usize,
        height: usize,
        band_count: usize,
        data_type: rasterlite_datatypes::raster::RasterDataType,
        actual: usize,
    },

    #[snafu(display("Encoding a tile with the GDAL {driver} driver failed: {source}"))]
    Encode {
        driver: String,
        source: gdal::errors::GdalError,
    },

    #[snafu(display(
        "Window {x_offset},{y_offset} {width}x{height} is outside of the {raster_width}x{raster_height} source raster"
    ))]
    WindowOutOfBounds {
        x_offset: usize,
        y_offset: usize,
        width: usize,
        height: usize,
        raster_width: usize,
        raster_height: usize,
    },

    #[snafu(display("Reading pixels from {source_name} failed: {source}"))]
    ReadWindow {
        source_name: String,
        source: gdal::errors::GdalError,
    },

    #[snafu(display("Stored geometry is not a polygon: {wkt}"))]
    InvalidStoredGeometry { wkt: String },

    #[snafu(display("Ingestion was aborted"))]
    Aborted,

    #[snafu(display("DataTypeError: {source}"))]
    DataType {
        source: rasterlite_datatypes::error::Error,
    },

    #[snafu(display("Gdal error: {source}"))]
    Gdal { source: gdal::errors::GdalError },

    #[snafu(display("Sqlite error: {source}"))]
    Sqlite { source: rusqlite::Error },

    #[snafu(display("Io error: {source}"))]
    Io { source: std::io::Error },
}

/// Coarse classification of failures, telling the caller how far an ingestion got before it failed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// rejected before the store was touched
    Configuration,
    /// store setup failed, before any tile was written
    Schema,
    /// a tile could not be encoded, the run was rolled back
    Encode,
    /// reading the source or writing the store failed
    Io,
    /// the progress callback asked to stop, the run was rolled back
    Aborted,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        use rasterlite_datatypes::error::Error as DataTypeError;

        match self {
            Error::NoBands
            | Error::DisallowedTileDriver { .. }
            | Error::UnknownTileDriver { .. }
            | Error::AmbiguousTargetTable { .. }
            | Error::EmptyTarget
            | Error::InvalidOption { .. }
            | Error::MalformedOption { .. } => ErrorCategory::Configuration,
            Error::MissingSpatialMetadata { .. }
            | Error::UnregisteredSrid { .. }
            | Error::UnregisteredGeometryColumn { .. }
            | Error::SridMismatch { .. }
            | Error::IncompleteSchema { .. }
            | Error::MissingTileTables { .. } => ErrorCategory::Schema,
            Error::TileBufferSize { .. } | Error::Encode { .. } => ErrorCategory::Encode,
            Error::WindowOutOfBounds { .. }
            | Error::ReadWindow { .. }
            | Error::InvalidStoredGeometry { .. }
            | Error::Gdal { .. }
            | Error::Sqlite { .. }
            | Error::Io { .. } => ErrorCategory::Io,
            Error::Aborted => ErrorCategory::Aborted,
            Error::DataType { source } => match source {
                DataTypeError::Gdal { .. } => ErrorCategory::Io,
                _ => ErrorCategory::Configuration,
            },
        }
    }
}

impl From<rasterlite_datatypes::error::Error> for Error {
    fn from(datatype_error: rasterlite_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(sqlite_error: rusqlite::Error) -> Self {
        Self::Sqlite {
            source: sqlite_error,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io { source: io_error }
    }
}
