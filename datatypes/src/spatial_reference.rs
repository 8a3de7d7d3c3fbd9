use crate::error;
use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};
use snafu::ResultExt;
use std::fmt;
use std::str::FromStr;

/// Authorities whose codes can be written as `AUTHORITY:CODE`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum SpatialReferenceAuthority {
    Epsg,
    SrOrg,
    Iau2000,
    Esri,
}

impl SpatialReferenceAuthority {
    pub fn as_str(self) -> &'static str {
        match self {
            SpatialReferenceAuthority::Epsg => "EPSG",
            SpatialReferenceAuthority::SrOrg => "SR-ORG",
            SpatialReferenceAuthority::Iau2000 => "IAU2000",
            SpatialReferenceAuthority::Esri => "ESRI",
        }
    }
}

impl fmt::Display for SpatialReferenceAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpatialReferenceAuthority {
    type Err = error::Error;

    /// Authority names are matched without regard to case, as GDAL reports them as they appear in the definition.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            SpatialReferenceAuthority::Epsg,
            SpatialReferenceAuthority::SrOrg,
            SpatialReferenceAuthority::Iau2000,
            SpatialReferenceAuthority::Esri,
        ]
        .into_iter()
        .find(|authority| authority.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| error::Error::InvalidSpatialReferenceString {
            spatial_reference_string: s.into(),
        })
    }
}

/// A registered reference system, identified by authority and code
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct SpatialReference {
    authority: SpatialReferenceAuthority,
    code: u32,
}

impl SpatialReference {
    pub fn new(authority: SpatialReferenceAuthority, code: u32) -> Self {
        Self { authority, code }
    }

    /// the WGS 84 spatial reference system
    pub fn epsg_4326() -> Self {
        Self::new(SpatialReferenceAuthority::Epsg, 4326)
    }

    pub fn authority(&self) -> SpatialReferenceAuthority {
        self.authority
    }

    pub fn code(self) -> u32 {
        self.code
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl FromStr for SpatialReference {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((authority, code)) if !code.contains(':') => Ok(Self::new(
                authority.parse()?,
                code.parse::<u32>().context(error::ParseU32)?,
            )),
            _ => Err(error::Error::InvalidSpatialReferenceString {
                spatial_reference_string: s.into(),
            }),
        }
    }
}

/// What a raster's projection definition says about itself: the authority it is registered with,
/// a label for projected systems and its PROJ parameter string.
///
/// Only the root node's authority is considered. A definition without one has no authority name
/// and a zero code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialReferenceDescriptor {
    pub authority_name: Option<String>,
    pub authority_code: i32,
    /// name of the projected coordinate system, `None` for geographic or local systems
    pub name: Option<String>,
    pub proj4: String,
}

impl SpatialReferenceDescriptor {
    /// Inspects a WKT definition. Returns `None` if the definition is empty or cannot be parsed.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        if wkt.trim().is_empty() {
            return None;
        }

        let mut srs = SpatialRef::from_wkt(wkt).ok()?;
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);

        // `AUTHORITY:CODE` of the root node, codes that are not integers count as missing
        let (authority_name, authority_code) = match srs.authority() {
            Ok(authority) => match authority.split_once(':') {
                Some((name, code)) => (
                    Some(name.to_string()).filter(|name| !name.is_empty()),
                    code.trim().parse().unwrap_or(0),
                ),
                None => (None, 0),
            },
            Err(_) => (None, 0),
        };

        let name = if srs.is_projected() {
            non_empty(srs.name())
        } else {
            None
        };

        Some(Self {
            authority_name,
            authority_code,
            name,
            proj4: srs.to_proj4().unwrap_or_default(),
        })
    }

    /// `true` if the definition can be tracked in a spatial reference registry
    pub fn is_registrable(&self) -> bool {
        self.authority_code != 0 && self.authority_name.is_some()
    }

    /// The definition as `AUTHORITY:CODE` if the authority is a known one
    pub fn spatial_reference(&self) -> Option<SpatialReference> {
        let authority = self.authority_name.as_deref()?.parse().ok()?;
        let code = u32::try_from(self.authority_code).ok()?;
        Some(SpatialReference::new(authority, code))
    }
}

/// The first value of a GDAL accessor, if any and not blank
fn non_empty(value: impl IntoIterator<Item = String>) -> Option<String> {
    value.into_iter().next().filter(|value| !value.trim().is_empty())
}
