use rasterlite_datatypes::spatial_reference::SpatialReferenceDescriptor;
use rusqlite::params;
use tracing::{debug, info, warn};

use crate::store::TileStore;
use crate::util::Result;

/// Identifier of a spatial reference system within one store
pub type Srid = i32;

/// The SRID of data whose reference system is unknown or not tracked
pub const NO_SRID: Srid = -1;

/// Resolves the reference system described by `projection_wkt` to an SRID of `store`,
/// registering it if the store does not know it yet.
///
/// Definitions that are missing, malformed or lack an authority resolve to [`NO_SRID`].
/// A new registration uses the authority code as SRID. If the store cannot take the registration,
/// the authority code is returned unregistered and the schema setup decides whether it is usable.
pub fn register_spatial_reference(store: &TileStore, projection_wkt: Option<&str>) -> Result<Srid> {
    let Some(descriptor) = projection_wkt.and_then(SpatialReferenceDescriptor::from_wkt) else {
        debug!("Source raster has no usable spatial reference");
        return Ok(NO_SRID);
    };

    if !descriptor.is_registrable() {
        debug!("Spatial reference has no authority, data stays unreferenced");
        return Ok(NO_SRID);
    }

    let auth_srid = descriptor.authority_code;

    if !store.has_spatial_metadata()? {
        warn!(
            "Store {} has no spatial_ref_sys table, using authority code {auth_srid} as SRID",
            store.path().display()
        );
        return Ok(auth_srid);
    }

    if let Some(srid) = store.spatial_reference_srid(auth_srid)? {
        debug!("Reusing SRID {srid} for authority code {auth_srid}");
        return Ok(srid);
    }

    let srid = auth_srid;
    if let Err(e) = store.connection().execute(
        "INSERT INTO spatial_ref_sys (srid, auth_name, auth_srid, ref_sys_name, proj4text)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            srid,
            descriptor.authority_name,
            auth_srid,
            descriptor.name,
            descriptor.proj4
        ],
    ) {
        warn!("Cannot register authority code {auth_srid} as SRID {srid}: {e}");
        return Ok(srid);
    }

    info!(
        "Registered spatial reference {} as SRID {srid}",
        descriptor
            .spatial_reference()
            .map_or_else(|| format!("code {auth_srid}"), |s| s.to_string())
    );

    Ok(srid)
}
