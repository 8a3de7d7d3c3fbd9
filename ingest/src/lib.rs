//! Copies rasters into a SQLite tile store: the raster is cut into blocks, every block is encoded
//! into a standalone raster file and stored together with its footprint in a spatially indexed table.

pub mod create_copy;
pub mod encoder;
pub mod error;
pub mod options;
pub mod overlap;
pub mod registrar;
pub mod schema;
pub mod source;
pub mod store;
pub mod target;
pub mod util;

pub use create_copy::{create_copy, create_copy_with_encoder, CopyReport};
pub use error::{Error, ErrorCategory};
pub use options::{CreateCopyOptions, TileDriver};
pub use source::{GdalSourceRaster, MemoryRaster, SourceRaster};
pub use store::{OpenMode, StoreSettings, TileStore, TileTables};
