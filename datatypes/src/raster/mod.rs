pub use self::data_type::RasterDataType;
pub use self::geo_transform::{GdalGeoTransform, GeoTransform};
pub use self::tiling::{
    Block, BlockLattice, BlockSize, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE,
};

mod data_type;
mod geo_transform;
mod tiling;
