use snafu::ensure;
use tracing::{debug, info, warn};

use crate::error;
use crate::registrar::Srid;
use crate::store::{OpenMode, TileStore, TileTables, GEOMETRY_COLUMN};
use crate::util::sql::quote_identifier;
use crate::util::Result;

/// Makes sure `tables` exist in `store` and are bound to `srid`.
///
/// New tables get a polygon geometry column with a spatial index. Existing tables must use the same SRID
/// unless `wipe` is set, in which case the SRID is rebound and all rows are deleted.
///
/// The handle is consumed: schema changes are only visible to a reopened store, which is returned.
/// Tables created before a failure are left in place.
pub fn ensure_tile_tables(
    store: TileStore,
    tables: &TileTables,
    srid: Srid,
    wipe: bool,
) -> Result<TileStore> {
    let rasters_table = tables.rasters();
    let metadata_table = tables.metadata();

    let rasters_exist = store.table_exists(&rasters_table)?;
    let metadata_exist = store.table_exists(&metadata_table)?;

    match (rasters_exist, metadata_exist) {
        (false, false) => create_tile_tables(store, tables, srid),
        (true, true) => reuse_tile_tables(store, tables, srid, wipe),
        _ => error::IncompleteSchema {
            rasters_table,
            metadata_table,
        }
        .fail(),
    }
}

fn create_tile_tables(store: TileStore, tables: &TileTables, srid: Srid) -> Result<TileStore> {
    let metadata_table = tables.metadata();

    store.connection().execute_batch(&format!(
        "CREATE TABLE {rasters} (
            id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            raster BLOB NOT NULL
        );
        CREATE TABLE {metadata} (
            id INTEGER NOT NULL PRIMARY KEY,
            source_name TEXT NOT NULL,
            tile_id INTEGER NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            pixel_x_size DOUBLE NOT NULL,
            pixel_y_size DOUBLE NOT NULL
        );",
        rasters = quote_identifier(&tables.rasters()),
        metadata = quote_identifier(&metadata_table),
    ))?;

    store.add_geometry_column(&metadata_table, GEOMETRY_COLUMN, srid, "POLYGON", 2)?;
    store.create_spatial_index(&metadata_table, GEOMETRY_COLUMN)?;

    if let Err(e) = store.update_layer_statistics() {
        debug!("Ignoring failed layer statistics update: {e}");
    }

    info!(
        "Created tile tables {} and {metadata_table} with SRID {srid}",
        tables.rasters()
    );

    store.reopen(OpenMode::Update)
}

fn reuse_tile_tables(
    mut store: TileStore,
    tables: &TileTables,
    srid: Srid,
    wipe: bool,
) -> Result<TileStore> {
    let metadata_table = tables.metadata();

    if let Some(existing_srid) = store.geometry_column_srid(&metadata_table)? {
        if existing_srid != srid {
            ensure!(
                wipe,
                error::SridMismatch {
                    table: metadata_table.clone(),
                    existing_srid,
                    srid,
                }
            );

            warn!("Rebinding {metadata_table} from SRID {existing_srid} to SRID {srid}");

            store.connection().execute(
                "UPDATE geometry_columns SET srid = ?1 WHERE f_table_name = ?2",
                rusqlite::params![srid, metadata_table],
            )?;

            store = store.reopen(OpenMode::Update)?;
        }
    }

    if wipe {
        store.connection().execute_batch(&format!(
            "DELETE FROM {};
             DELETE FROM {};",
            quote_identifier(&tables.rasters()),
            quote_identifier(&metadata_table),
        ))?;

        info!("Wiped tile tables of {}", tables.prefix());
    } else {
        debug!("Appending to existing tile tables of {}", tables.prefix());
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::{NewTile, StoreSettings};
    use rasterlite_datatypes::primitives::BoundingBox2D;
    use tempfile::tempdir;

    fn insert_tile(store: &mut TileStore, tables: &TileTables) {
        let writer = store.begin(tables).unwrap();
        let id = writer.insert_raster(&[1, 2, 3]).unwrap();
        writer
            .insert_metadata(
                id,
                &NewTile {
                    source_name: "test",
                    tile_id: 0,
                    width: 1,
                    height: 1,
                    pixel_x_size: 1.0,
                    pixel_y_size: 1.0,
                    bounds: BoundingBox2D::new((0.0, 0.0).into(), (1.0, 1.0).into()).unwrap(),
                },
            )
            .unwrap();
        writer.commit().unwrap();
    }

    #[test]
    fn creates_tables() {
        let dir = tempdir().unwrap();
        let store =
            TileStore::create(dir.path().join("t.sqlite"), StoreSettings::default()).unwrap();
        let tables = TileTables::new("ortho");

        let store = ensure_tile_tables(store, &tables, -1, false).unwrap();

        assert!(store.table_exists("ortho_rasters").unwrap());
        assert!(store.table_exists("ortho_metadata").unwrap());
        assert!(store.table_exists("idx_ortho_metadata_geometry").unwrap());
        assert_eq!(store.geometry_column_srid("ortho_metadata").unwrap(), Some(-1));
        assert_eq!(store.row_count("layer_statistics").unwrap(), 1);
    }

    #[test]
    fn appends_to_matching_tables() {
        let dir = tempdir().unwrap();
        let store =
            TileStore::create(dir.path().join("t.sqlite"), StoreSettings::default()).unwrap();
        let tables = TileTables::new("ortho");
        let mut store = ensure_tile_tables(store, &tables, -1, false).unwrap();
        insert_tile(&mut store, &tables);

        let store = ensure_tile_tables(store, &tables, -1, false).unwrap();

        assert_eq!(store.row_count("ortho_metadata").unwrap(), 1);
    }

    #[test]
    fn rejects_srid_mismatch_without_wipe() {
        let dir = tempdir().unwrap();
        let store =
            TileStore::create(dir.path().join("t.sqlite"), StoreSettings::default()).unwrap();
        let tables = TileTables::new("ortho");
        let mut store = ensure_tile_tables(store, &tables, -1, false).unwrap();
        insert_tile(&mut store, &tables);
        let path = store.path().to_path_buf();

        let result = ensure_tile_tables(store, &tables, 0, false);

        assert!(matches!(
            result,
            Err(Error::SridMismatch {
                existing_srid: -1,
                srid: 0,
                ..
            })
        ));

        let store = TileStore::open(path, OpenMode::ReadOnly, StoreSettings::default()).unwrap();
        assert_eq!(store.row_count("ortho_metadata").unwrap(), 1);
    }

    #[test]
    fn wipe_rebinds_srid_and_deletes_rows() {
        let dir = tempdir().unwrap();
        let store =
            TileStore::create(dir.path().join("t.sqlite"), StoreSettings::default()).unwrap();
        let tables = TileTables::new("ortho");
        let mut store = ensure_tile_tables(store, &tables, -1, false).unwrap();
        insert_tile(&mut store, &tables);

        let store = ensure_tile_tables(store, &tables, 0, true).unwrap();

        assert_eq!(store.geometry_column_srid("ortho_metadata").unwrap(), Some(0));
        assert_eq!(store.row_count("ortho_rasters").unwrap(), 0);
        assert_eq!(store.row_count("ortho_metadata").unwrap(), 0);
        assert_eq!(store.row_count("idx_ortho_metadata_geometry").unwrap(), 0);
    }

    #[test]
    fn incomplete_schema() {
        let dir = tempdir().unwrap();
        let store =
            TileStore::create(dir.path().join("t.sqlite"), StoreSettings::default()).unwrap();
        store
            .connection()
            .execute_batch("CREATE TABLE ortho_rasters (id INTEGER PRIMARY KEY)")
            .unwrap();

        let result = ensure_tile_tables(store, &TileTables::new("ortho"), -1, false);

        assert!(matches!(result, Err(Error::IncompleteSchema { .. })));
    }

    #[test]
    fn store_without_spatial_catalog_keeps_created_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.sqlite");
        rusqlite::Connection::open(&path).unwrap();
        let store = TileStore::open(&path, OpenMode::Update, StoreSettings::default()).unwrap();

        let result = ensure_tile_tables(store, &TileTables::new("ortho"), -1, false);
        assert!(matches!(
            result,
            Err(Error::MissingSpatialMetadata { .. })
        ));

        let store = TileStore::open(&path, OpenMode::ReadOnly, StoreSettings::default()).unwrap();
        assert!(store.table_exists("ortho_rasters").unwrap());
        assert!(store.table_exists("ortho_metadata").unwrap());
        assert_eq!(store.row_count("ortho_metadata").unwrap(), 0);
    }
}
