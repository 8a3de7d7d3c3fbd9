//! The tile store: a single SQLite file holding tile tables and the spatial catalog that describes them.

use std::path::{Path, PathBuf};

use geo::BoundingRect;
use rasterlite_datatypes::primitives::BoundingBox2D;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wkt::TryFromWkt;

use crate::error::Error;
use crate::util::sql::quote_identifier;
use crate::util::Result;

mod spatial;
mod writer;

pub use spatial::{spatial_index_name, GEOMETRY_COLUMN, UNDEFINED_SRIDS};
pub use writer::{NewTile, TileWriter};

/// `SQLite` journal mode of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    #[default]
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Truncate => "truncate",
            Self::Persist => "persist",
            Self::Memory => "memory",
            Self::Wal => "wal",
            Self::Off => "off",
        }
    }
}

/// `SQLite` synchronous mode of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronousMode {
    Off,
    Normal,
    #[default]
    Full,
    Extra,
}

impl SynchronousMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Normal => "normal",
            Self::Full => "full",
            Self::Extra => "extra",
        }
    }
}

/// Durability settings applied whenever the store is opened for update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub journal_mode: JournalMode,
    pub synchronous: SynchronousMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    Update,
}

/// The pair of tables a create-copy run writes to, named after a common prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileTables {
    prefix: String,
}

impl TileTables {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>_rasters`, one encoded tile per row
    pub fn rasters(&self) -> String {
        format!("{}_rasters", self.prefix)
    }

    /// `<prefix>_metadata`, the footprint and size of each tile
    pub fn metadata(&self) -> String {
        format!("{}_metadata", self.prefix)
    }

    pub fn spatial_index(&self) -> String {
        spatial_index_name(&self.metadata(), GEOMETRY_COLUMN)
    }
}

/// A row of the metadata table
#[derive(Debug, Clone, PartialEq)]
pub struct TileMetadata {
    pub id: i64,
    pub source_name: String,
    pub tile_id: i64,
    pub width: i64,
    pub height: i64,
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
    pub geometry: geo::Polygon<f64>,
}

impl TileMetadata {
    pub fn bounds(&self) -> Option<BoundingBox2D> {
        self.geometry.bounding_rect().map(BoundingBox2D::from)
    }
}

#[derive(Debug)]
pub struct TileStore {
    path: PathBuf,
    connection: Connection,
    mode: OpenMode,
    settings: StoreSettings,
}

impl TileStore {
    /// Creates a new store file at `path` including the spatial catalog.
    pub fn create(path: impl AsRef<Path>, settings: StoreSettings) -> Result<Self> {
        let path = path.as_ref();
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let store = Self::from_connection(path, connection, OpenMode::Update, settings)?;
        store.init_spatial_metadata()?;

        debug!("Created tile store {}", path.display());

        Ok(store)
    }

    /// Opens an existing store file
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, settings: StoreSettings) -> Result<Self> {
        let path = path.as_ref();
        let flags = match mode {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::Update => OpenFlags::SQLITE_OPEN_READ_WRITE,
        } | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let connection = Connection::open_with_flags(path, flags)?;

        Self::from_connection(path, connection, mode, settings)
    }

    /// Closes this handle and opens the same store again, so that schema changes are visible to the new handle.
    pub fn reopen(self, mode: OpenMode) -> Result<Self> {
        let Self {
            path,
            connection,
            settings,
            ..
        } = self;

        connection.close().map_err(|(_, e)| Error::from(e))?;

        debug!("Reopening tile store {}", path.display());

        Self::open(path, mode, settings)
    }

    fn from_connection(
        path: &Path,
        connection: Connection,
        mode: OpenMode,
        settings: StoreSettings,
    ) -> Result<Self> {
        apply_pragmas(&connection, mode, settings)?;

        Ok(Self {
            path: path.to_path_buf(),
            connection,
            mode,
            settings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Starts the transaction that writes tiles into `tables`.
    /// Dropping the writer without committing rolls the transaction back.
    pub fn begin(&mut self, tables: &TileTables) -> Result<TileWriter<'_>> {
        let transaction = self.connection.transaction()?;
        Ok(TileWriter::new(transaction, tables))
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        spatial::table_exists(&self.connection, table)
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = self.connection.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// The SRID the geometry column of `table` is registered with
    pub fn geometry_column_srid(&self, table: &str) -> Result<Option<i32>> {
        Ok(self
            .connection
            .query_row(
                "SELECT srid FROM geometry_columns WHERE f_table_name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// The SRID registered for the authority code `auth_srid`
    pub fn spatial_reference_srid(&self, auth_srid: i32) -> Result<Option<i32>> {
        Ok(self
            .connection
            .query_row(
                "SELECT srid FROM spatial_ref_sys WHERE auth_srid = ?1",
                params![auth_srid],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// All metadata rows of `tables`, ordered by id
    pub fn tile_metadata(&self, tables: &TileTables) -> Result<Vec<TileMetadata>> {
        let mut statement = self.connection.prepare(&format!(
            "SELECT id, source_name, tile_id, width, height, pixel_x_size, pixel_y_size, {} FROM {} ORDER BY id",
            quote_identifier(GEOMETRY_COLUMN),
            quote_identifier(&tables.metadata()),
        ))?;

        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        rows.map(|row| -> Result<TileMetadata> {
            let (id, source_name, tile_id, width, height, pixel_x_size, pixel_y_size, wkt) = row?;

            let geometry = geo::Polygon::<f64>::try_from_wkt_str(&wkt)
                .map_err(|_| Error::InvalidStoredGeometry { wkt: wkt.clone() })?;

            Ok(TileMetadata {
                id,
                source_name,
                tile_id,
                width,
                height,
                pixel_x_size,
                pixel_y_size,
                geometry,
            })
        })
        .collect()
    }

    /// The encoded tile with the given id
    pub fn tile_blob(&self, tables: &TileTables, id: i64) -> Result<Option<Vec<u8>>> {
        Ok(self
            .connection
            .query_row(
                &format!(
                    "SELECT raster FROM {} WHERE id = ?1",
                    quote_identifier(&tables.rasters())
                ),
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }
}

/// Applies the durability pragmas. Read-only handles are additionally guarded against writes.
fn apply_pragmas(connection: &Connection, mode: OpenMode, settings: StoreSettings) -> Result<()> {
    match mode {
        OpenMode::ReadOnly => connection.execute_batch("PRAGMA query_only = ON;")?,
        OpenMode::Update => {
            connection.pragma_update_and_check(
                None,
                "journal_mode",
                settings.journal_mode.pragma_value(),
                |row| row.get::<_, String>(0),
            )?;
            connection.execute_batch(&format!(
                "PRAGMA synchronous = {};",
                settings.synchronous.pragma_value()
            ))?;
        }
    }
    Ok(())
}
