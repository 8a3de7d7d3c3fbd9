use rasterlite_datatypes::primitives::BoundingBox2D;
use rusqlite::{params, Transaction};
use wkt::ToWkt;

use super::{TileTables, GEOMETRY_COLUMN};
use crate::util::sql::quote_identifier;
use crate::util::Result;

/// The metadata of a tile that is about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewTile<'a> {
    pub source_name: &'a str,
    pub tile_id: usize,
    pub width: usize,
    pub height: usize,
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
    pub bounds: BoundingBox2D,
}

/// Writes tiles into a pair of tile tables within one transaction.
/// Nothing becomes visible until [`TileWriter::commit`]; a dropped writer rolls back.
#[derive(Debug)]
pub struct TileWriter<'a> {
    transaction: Transaction<'a>,
    insert_raster_sql: String,
    insert_metadata_sql: String,
    insert_index_sql: String,
}

impl<'a> TileWriter<'a> {
    pub(super) fn new(transaction: Transaction<'a>, tables: &TileTables) -> Self {
        Self {
            transaction,
            insert_raster_sql: format!(
                "INSERT INTO {} (raster) VALUES (?1)",
                quote_identifier(&tables.rasters())
            ),
            insert_metadata_sql: format!(
                "INSERT INTO {} (id, source_name, tile_id, width, height, pixel_x_size, pixel_y_size, {})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                quote_identifier(&tables.metadata()),
                quote_identifier(GEOMETRY_COLUMN),
            ),
            insert_index_sql: format!(
                "INSERT INTO {} (pkid, xmin, xmax, ymin, ymax) VALUES (?1, ?2, ?3, ?4, ?5)",
                quote_identifier(&tables.spatial_index())
            ),
        }
    }

    /// Stores an encoded tile and returns the id assigned to it
    pub fn insert_raster(&self, blob: &[u8]) -> Result<i64> {
        self.transaction
            .prepare_cached(&self.insert_raster_sql)?
            .execute(params![blob])?;
        Ok(self.transaction.last_insert_rowid())
    }

    /// Stores the metadata row of the tile with id `id` together with its spatial index entry
    pub fn insert_metadata(&self, id: i64, tile: &NewTile<'_>) -> Result<()> {
        let geometry = tile.bounds.to_polygon().wkt_string();

        self.transaction
            .prepare_cached(&self.insert_metadata_sql)?
            .execute(params![
                id,
                tile.source_name,
                tile.tile_id as i64,
                tile.width as i64,
                tile.height as i64,
                tile.pixel_x_size,
                tile.pixel_y_size,
                geometry,
            ])?;

        let lower_left = tile.bounds.lower_left();
        let upper_right = tile.bounds.upper_right();
        self.transaction
            .prepare_cached(&self.insert_index_sql)?
            .execute(params![
                id,
                lower_left.x,
                upper_right.x,
                lower_left.y,
                upper_right.y
            ])?;

        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.transaction.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.transaction.rollback()?;
        Ok(())
    }
}
