//! A minimal spatial catalog in the layout of `SpatiaLite`: registered reference systems,
//! registered geometry columns with their SRID, R*Tree spatial indexes and per-layer statistics.
//! Geometries are stored as WKT text.

use rusqlite::{params, Connection, OptionalExtension};
use snafu::ensure;
use tracing::debug;

use super::TileStore;
use crate::error;
use crate::util::sql::quote_identifier;
use crate::util::Result;

/// Name of the geometry column of metadata tables
pub const GEOMETRY_COLUMN: &str = "geometry";

/// SRIDs that may be bound to a geometry column without being registered
pub const UNDEFINED_SRIDS: [i32; 2] = [-1, 0];

pub fn spatial_index_name(table: &str, column: &str) -> String {
    format!("idx_{table}_{column}")
}

fn spatial_index_trigger_name(table: &str, column: &str) -> String {
    format!("gid_{table}_{column}")
}

pub(crate) fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(exists)
}

impl TileStore {
    /// Creates the catalog tables of an empty store
    pub(crate) fn init_spatial_metadata(&self) -> Result<()> {
        self.connection().execute_batch(
            "CREATE TABLE IF NOT EXISTS spatial_ref_sys (
                srid INTEGER NOT NULL PRIMARY KEY,
                auth_name TEXT NOT NULL,
                auth_srid INTEGER NOT NULL,
                ref_sys_name TEXT,
                proj4text TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS geometry_columns (
                f_table_name TEXT NOT NULL,
                f_geometry_column TEXT NOT NULL,
                geometry_type TEXT NOT NULL,
                coord_dimension INTEGER NOT NULL,
                srid INTEGER NOT NULL,
                spatial_index_enabled INTEGER NOT NULL,
                PRIMARY KEY (f_table_name, f_geometry_column)
            );
            CREATE TABLE IF NOT EXISTS layer_statistics (
                table_name TEXT NOT NULL,
                geometry_column TEXT NOT NULL,
                row_count INTEGER,
                extent_min_x DOUBLE,
                extent_min_y DOUBLE,
                extent_max_x DOUBLE,
                extent_max_y DOUBLE,
                PRIMARY KEY (table_name, geometry_column)
            );",
        )?;
        Ok(())
    }

    pub fn has_spatial_metadata(&self) -> Result<bool> {
        Ok(table_exists(self.connection(), "spatial_ref_sys")?
            && table_exists(self.connection(), "geometry_columns")?)
    }

    pub(crate) fn ensure_spatial_metadata(&self) -> Result<()> {
        ensure!(
            self.has_spatial_metadata()?,
            error::MissingSpatialMetadata {
                store_path: self.path().to_path_buf()
            }
        );
        Ok(())
    }

    /// Appends a geometry column to `table` and registers it with `srid` in the catalog.
    pub fn add_geometry_column(
        &self,
        table: &str,
        column: &str,
        srid: i32,
        geometry_type: &str,
        coord_dimension: u8,
    ) -> Result<()> {
        self.ensure_spatial_metadata()?;

        if !UNDEFINED_SRIDS.contains(&srid) {
            let registered: i64 = self.connection().query_row(
                "SELECT COUNT(*) FROM spatial_ref_sys WHERE srid = ?1",
                params![srid],
                |row| row.get(0),
            )?;
            ensure!(registered > 0, error::UnregisteredSrid { srid });
        }

        self.connection().execute(
            &format!(
                "ALTER TABLE {} ADD COLUMN {} TEXT",
                quote_identifier(table),
                quote_identifier(column)
            ),
            [],
        )?;

        self.connection().execute(
            "INSERT INTO geometry_columns
                (f_table_name, f_geometry_column, geometry_type, coord_dimension, srid, spatial_index_enabled)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![table, column, geometry_type, coord_dimension, srid],
        )?;

        debug!("Added {geometry_type} column {table}.{column} with SRID {srid}");

        Ok(())
    }

    /// Creates the R*Tree index of a registered geometry column.
    /// Rows deleted from `table` are removed from the index by a trigger.
    pub fn create_spatial_index(&self, table: &str, column: &str) -> Result<()> {
        self.ensure_spatial_metadata()?;

        let updated = self.connection().execute(
            "UPDATE geometry_columns SET spatial_index_enabled = 1
             WHERE f_table_name = ?1 AND f_geometry_column = ?2",
            params![table, column],
        )?;
        ensure!(
            updated == 1,
            error::UnregisteredGeometryColumn {
                table,
                column
            }
        );

        let index = quote_identifier(&spatial_index_name(table, column));

        self.connection().execute_batch(&format!(
            "CREATE VIRTUAL TABLE {index} USING rtree(pkid, xmin, xmax, ymin, ymax);
             CREATE TRIGGER {trigger} AFTER DELETE ON {table} FOR EACH ROW
             BEGIN
                 DELETE FROM {index} WHERE pkid = OLD.rowid;
             END;",
            trigger = quote_identifier(&spatial_index_trigger_name(table, column)),
            table = quote_identifier(table),
        ))?;

        debug!("Created spatial index on {table}.{column}");

        Ok(())
    }

    /// Recomputes row count and extent of every registered geometry column
    pub fn update_layer_statistics(&self) -> Result<()> {
        self.ensure_spatial_metadata()?;

        let layers = {
            let mut statement = self.connection().prepare(
                "SELECT f_table_name, f_geometry_column, spatial_index_enabled FROM geometry_columns",
            )?;
            let rows = statement.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for (table, column, indexed) in layers {
            let row_count: i64 = self.connection().query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_identifier(&table)),
                [],
                |row| row.get(0),
            )?;

            let extent: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = if indexed {
                self.connection().query_row(
                    &format!(
                        "SELECT MIN(xmin), MIN(ymin), MAX(xmax), MAX(ymax) FROM {}",
                        quote_identifier(&spatial_index_name(&table, &column))
                    ),
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?
            } else {
                (None, None, None, None)
            };

            self.connection().execute(
                "INSERT OR REPLACE INTO layer_statistics
                    (table_name, geometry_column, row_count, extent_min_x, extent_min_y, extent_max_x, extent_max_y)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![table, column, row_count, extent.0, extent.1, extent.2, extent.3],
            )?;
        }

        Ok(())
    }
}
