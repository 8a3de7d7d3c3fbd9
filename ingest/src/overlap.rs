use rasterlite_datatypes::primitives::BoundingBox2D;
use rusqlite::params;
use tracing::warn;

use crate::store::{TileStore, TileTables, GEOMETRY_COLUMN};
use crate::util::sql::quote_identifier;
use crate::util::Result;

/// Pixel sizes closer than this are considered equal
const PIXEL_SIZE_EPSILON: f64 = 1e-15;

/// Counts the tiles in `tables` whose footprint intersects `bounds` and whose pixel size equals the given one.
/// Footprints that only touch `bounds` do not count.
pub fn count_overlapping_tiles(
    store: &TileStore,
    tables: &TileTables,
    bounds: BoundingBox2D,
    pixel_x_size: f64,
    pixel_y_size: f64,
) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT({geometry}) FROM {metadata}
         WHERE rowid IN (
             SELECT pkid FROM {index}
             WHERE xmin < ?1 AND xmax > ?2 AND ymin < ?3 AND ymax > ?4
         )
         AND pixel_x_size >= ?5 AND pixel_x_size <= ?6
         AND pixel_y_size >= ?7 AND pixel_y_size <= ?8",
        geometry = quote_identifier(GEOMETRY_COLUMN),
        metadata = quote_identifier(&tables.metadata()),
        index = quote_identifier(&tables.spatial_index()),
    );

    let lower_left = bounds.lower_left();
    let upper_right = bounds.upper_right();

    let count: i64 = store.connection().query_row(
        &sql,
        params![
            upper_right.x,
            lower_left.x,
            upper_right.y,
            lower_left.y,
            pixel_x_size - PIXEL_SIZE_EPSILON,
            pixel_x_size + PIXEL_SIZE_EPSILON,
            pixel_y_size - PIXEL_SIZE_EPSILON,
            pixel_y_size + PIXEL_SIZE_EPSILON,
        ],
        |row| row.get(0),
    )?;

    Ok(count as u64)
}

/// Warns if data of the same resolution already exists within `bounds`. Never fails the ingestion.
pub fn warn_about_overlapping_tiles(
    store: &TileStore,
    tables: &TileTables,
    bounds: BoundingBox2D,
    pixel_x_size: f64,
    pixel_y_size: f64,
) -> u64 {
    match count_overlapping_tiles(store, tables, bounds, pixel_x_size, pixel_y_size) {
        Ok(0) => 0,
        Ok(count) => {
            warn!(
                "Raster tiles already exist in the {} table within the extent of the data to be inserted in",
                tables.prefix()
            );
            count
        }
        Err(e) => {
            warn!("Could not check for overlapping tiles: {e}");
            0
        }
    }
}
