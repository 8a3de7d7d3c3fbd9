//! Copying a raster into a pair of tile tables: one encoded tile per block of the source.

use std::path::PathBuf;

use rasterlite_datatypes::primitives::BoundingBox2D;
use rasterlite_datatypes::raster::{Block, BlockLattice, GeoTransform};
use snafu::ensure;
use tracing::{debug, info, warn};

use crate::encoder::{GdalTileEncoder, TileBuffer, TileEncoder};
use crate::error;
use crate::options::CreateCopyOptions;
use crate::overlap::warn_about_overlapping_tiles;
use crate::registrar::{register_spatial_reference, Srid};
use crate::schema::ensure_tile_tables;
use crate::source::SourceRaster;
use crate::store::{NewTile, OpenMode, StoreSettings, TileStore, TileTables, TileWriter};
use crate::target::TargetSpecifier;
use crate::util::Result;

/// The result of a successful run
#[derive(Debug)]
pub struct CopyReport {
    /// the store, reopened for update
    pub store: TileStore,
    pub tables: TileTables,
    pub srid: Srid,
    pub tile_count: usize,
    /// footprint of the copied raster
    pub bounds: BoundingBox2D,
    /// tiles of the same resolution that already covered the footprint before the run
    pub overlapping_tiles: u64,
}

/// Copies `source` into the tile store named by `target`, encoding the tiles with the driver of `options`.
///
/// `progress` is called after every tile with the completed fraction. Returning `false` aborts the run.
/// Either all tiles of the run are committed or none is.
pub fn create_copy<P>(
    target: &str,
    source: &dyn SourceRaster,
    options: &CreateCopyOptions,
    settings: StoreSettings,
    progress: P,
) -> Result<CopyReport>
where
    P: FnMut(f64, &str) -> bool,
{
    ensure!(source.band_count() > 0, error::NoBands);
    options.validate()?;

    let encoder = GdalTileEncoder::new(options)?;

    create_copy_with_encoder(target, source, options, settings, &encoder, progress)
}

/// Like [`create_copy`], but with a caller-provided encoder
pub fn create_copy_with_encoder<P>(
    target: &str,
    source: &dyn SourceRaster,
    options: &CreateCopyOptions,
    settings: StoreSettings,
    encoder: &dyn TileEncoder,
    mut progress: P,
) -> Result<CopyReport>
where
    P: FnMut(f64, &str) -> bool,
{
    ensure!(source.band_count() > 0, error::NoBands);
    options.validate()?;
    ensure!(
        options.driver.is_durable(),
        error::DisallowedTileDriver {
            driver: options.driver.gdal_name(),
        }
    );

    let geo_transform = match source.geo_transform() {
        Some(gdal_geo_transform) => GeoTransform::try_from(gdal_geo_transform)?,
        None => {
            debug!("Source raster is not georeferenced, using the identity transform");
            GeoTransform::default()
        }
    };

    let (width, height) = source.size();
    let lattice = options.lattice(width, height)?;

    let target: TargetSpecifier = target.parse()?;
    let store_path: PathBuf = target.store_path().to_path_buf();
    let store_exists = store_path.exists();
    let tables = target.resolve_tables(store_exists)?;

    let store = if store_exists {
        TileStore::open(&store_path, OpenMode::Update, settings)?
    } else {
        TileStore::create(&store_path, settings)?
    };

    let srid = register_spatial_reference(&store, source.projection_wkt().as_deref())?;
    debug!("Source raster resolved to SRID {srid}");

    let mut store = ensure_tile_tables(store, &tables, srid, options.wipe)?;

    ensure!(
        store.table_exists(&tables.rasters())? && store.table_exists(&tables.metadata())?,
        error::MissingTileTables {
            prefix: tables.prefix(),
        }
    );

    let bounds = geo_transform.raster_bounds(width, height);
    let (pixel_x_size, pixel_y_size) = geo_transform.absolute_pixel_size();
    let overlapping_tiles =
        warn_about_overlapping_tiles(&store, &tables, bounds, pixel_x_size, pixel_y_size);

    debug!(
        "Copying {width}x{height} pixels in {} tiles of {}x{} using {}",
        lattice.number_of_blocks(),
        lattice.block_size().width,
        lattice.block_size().height,
        encoder.format_name()
    );

    let tile_count = {
        let writer = store.begin(&tables)?;
        let blocks = BlockCopy {
            source,
            encoder,
            geo_transform: &geo_transform,
            source_name: source.description(),
        };

        match blocks.write_all(&writer, &lattice, &mut progress) {
            Ok(tile_count) => {
                writer.commit()?;
                tile_count
            }
            Err(e) => {
                if let Err(rollback_error) = writer.rollback() {
                    warn!("Rolling back the tiles of {} failed: {rollback_error}", tables.prefix());
                }
                debug!("Rolled back the tiles of {}", tables.prefix());
                return Err(e);
            }
        }
    };

    let store = store.reopen(OpenMode::Update)?;

    info!(
        "Copied {tile_count} tiles into {} of {}",
        tables.prefix(),
        store.path().display()
    );

    Ok(CopyReport {
        store,
        tables,
        srid,
        tile_count,
        bounds,
        overlapping_tiles,
    })
}

/// Reads, encodes and stores the blocks of one source
struct BlockCopy<'a> {
    source: &'a dyn SourceRaster,
    encoder: &'a dyn TileEncoder,
    geo_transform: &'a GeoTransform,
    source_name: String,
}

impl BlockCopy<'_> {
    fn write_all<P>(
        &self,
        writer: &TileWriter<'_>,
        lattice: &BlockLattice,
        progress: &mut P,
    ) -> Result<usize>
    where
        P: FnMut(f64, &str) -> bool,
    {
        let total = lattice.number_of_blocks();
        let block_size = lattice.block_size();

        // sized for a full block, edge blocks use a prefix of it
        let mut buffer = vec![0_u8; self.source.window_len(block_size.width, block_size.height)];

        for block in lattice.blocks() {
            self.write_block(writer, &block, &mut buffer)?;

            let fraction = (block.index + 1) as f64 / total as f64;
            let message = format!("tile {} of {total}", block.index + 1);
            ensure!(progress(fraction, &message), error::Aborted);
        }

        Ok(total)
    }

    fn write_block(&self, writer: &TileWriter<'_>, block: &Block, buffer: &mut [u8]) -> Result<()> {
        let window = &mut buffer[..self.source.window_len(block.width, block.height)];

        self.source.read_window(
            block.x_offset,
            block.y_offset,
            block.width,
            block.height,
            window,
        )?;

        let tile = TileBuffer::new(
            window,
            block.width,
            block.height,
            self.source.band_count(),
            self.source.data_type(),
        )?;
        let blob = self.encoder.encode(&tile)?;

        let id = writer.insert_raster(&blob)?;

        let (pixel_x_size, pixel_y_size) = self.geo_transform.absolute_pixel_size();
        writer.insert_metadata(
            id,
            &NewTile {
                source_name: &self.source_name,
                tile_id: block.index,
                width: block.width,
                height: block.height,
                pixel_x_size,
                pixel_y_size,
                bounds: self.geo_transform.window_bounds(
                    block.x_offset,
                    block.y_offset,
                    block.width,
                    block.height,
                ),
            },
        )?;

        Ok(())
    }
}
