use crate::error::{self, Error};
use gdal_sys::GDALDataType;
use serde::{Deserialize, Serialize};

/// Pixel data types that can travel from a source raster into an encoded tile.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Deserialize, Serialize, Copy, Clone)]
pub enum RasterDataType {
    U8,
    U16,
    U32,
    I16,
    I32,
    F32,
    F64,
}

impl RasterDataType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            RasterDataType::U8 => 1,
            RasterDataType::U16 | RasterDataType::I16 => 2,
            RasterDataType::U32 | RasterDataType::I32 | RasterDataType::F32 => 4,
            RasterDataType::F64 => 8,
        }
    }

    pub fn from_gdal_data_type(gdal_data_type: GDALDataType::Type) -> Result<Self, Error> {
        match gdal_data_type {
            GDALDataType::GDT_Byte => Ok(Self::U8),
            GDALDataType::GDT_UInt16 => Ok(Self::U16),
            GDALDataType::GDT_Int16 => Ok(Self::I16),
            GDALDataType::GDT_UInt32 => Ok(Self::U32),
            GDALDataType::GDT_Int32 => Ok(Self::I32),
            GDALDataType::GDT_Float32 => Ok(Self::F32),
            GDALDataType::GDT_Float64 => Ok(Self::F64),
            _ => Err(error::Error::UnsupportedGdalDataType {
                gdal_data_type: gdal_data_type as u32,
            }),
        }
    }

    pub fn gdal_data_type(self) -> GDALDataType::Type {
        match self {
            Self::U8 => GDALDataType::GDT_Byte,
            Self::U16 => GDALDataType::GDT_UInt16,
            Self::I16 => GDALDataType::GDT_Int16,
            Self::U32 => GDALDataType::GDT_UInt32,
            Self::I32 => GDALDataType::GDT_Int32,
            Self::F32 => GDALDataType::GDT_Float32,
            Self::F64 => GDALDataType::GDT_Float64,
        }
    }
}

impl std::fmt::Display for RasterDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
