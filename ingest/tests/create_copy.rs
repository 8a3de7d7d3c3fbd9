use std::cell::Cell;
use std::path::Path;

use approx::assert_relative_eq;
use gdal::DriverManager;
use pretty_assertions::assert_eq;
use rasterlite_datatypes::primitives::BoundingBox2D;
use rasterlite_ingest::encoder::{TileBuffer, TileEncoder};
use rasterlite_ingest::store::TileMetadata;
use rasterlite_ingest::util::Result;
use rasterlite_ingest::{
    create_copy, create_copy_with_encoder, CreateCopyOptions, Error, ErrorCategory,
    GdalSourceRaster, MemoryRaster, OpenMode, SourceRaster, StoreSettings, TileStore, TileTables,
};
use tempfile::tempdir;

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const UTM_32N_WKT: &str = r#"PROJCS["WGS 84 / UTM zone 32N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",9],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","32632"]]"#;

const GEO_TRANSFORM: [f64; 6] = [10.0, 0.5, 0.0, 50.0, 0.0, -0.5];

/// Stores the raw pixels and fails on the tile with the given number
struct RawEncoder {
    fail_on: Option<usize>,
    calls: Cell<usize>,
}

impl RawEncoder {
    fn new() -> Self {
        Self {
            fail_on: None,
            calls: Cell::new(0),
        }
    }

    fn failing_on(tile: usize) -> Self {
        Self {
            fail_on: Some(tile),
            calls: Cell::new(0),
        }
    }
}

impl TileEncoder for RawEncoder {
    fn encode(&self, tile: &TileBuffer<'_>) -> Result<Vec<u8>> {
        let call = self.calls.get();
        self.calls.set(call + 1);

        if self.fail_on == Some(call) {
            return Err(Error::Encode {
                driver: "raw".to_string(),
                source: gdal::errors::GdalError::BadArgument("forced failure".to_string()),
            });
        }

        Ok(tile.data().to_vec())
    }

    fn format_name(&self) -> &str {
        "raw"
    }
}

fn ortho(width: usize, height: usize) -> MemoryRaster {
    MemoryRaster::from_fn(width, height, |column, row| ((column / 7) ^ (row / 5)) as u8)
        .with_geo_transform(GEO_TRANSFORM)
        .with_projection(WGS84_WKT)
        .with_description("ortho.tif")
}

fn options(pairs: &[(&str, &str)]) -> CreateCopyOptions {
    CreateCopyOptions::from_key_value_pairs(pairs.iter().copied()).unwrap()
}

fn target(path: &Path, table: Option<&str>) -> String {
    match table {
        Some(table) => format!("RASTERLITE:{},table={table}", path.display()),
        None => path.display().to_string(),
    }
}

fn copy_raw(
    target: &str,
    source: &dyn SourceRaster,
    options: &CreateCopyOptions,
    encoder: &RawEncoder,
) -> Result<rasterlite_ingest::CopyReport> {
    create_copy_with_encoder(
        target,
        source,
        options,
        StoreSettings::default(),
        encoder,
        |_, _| true,
    )
}

fn tile_bounds(tiles: &[TileMetadata]) -> Vec<BoundingBox2D> {
    tiles.iter().map(|tile| tile.bounds().unwrap()).collect()
}

#[test]
fn it_copies_into_geotiff_tiles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ortho.sqlite");

    let report = create_copy(
        &target(&path, None),
        &ortho(600, 600),
        &CreateCopyOptions::default(),
        StoreSettings::default(),
        |_, _| true,
    )
    .unwrap();

    assert_eq!(report.tile_count, 9);
    assert_eq!(report.srid, 4326);
    assert_eq!(report.tables, TileTables::new("ortho"));

    let store = report.store;
    let tiles = store.tile_metadata(&report.tables).unwrap();

    assert_eq!(
        tiles.iter().map(|t| t.tile_id).collect::<Vec<_>>(),
        (0..9).collect::<Vec<i64>>()
    );
    assert_eq!(
        tiles.iter().map(|t| (t.width, t.height)).collect::<Vec<_>>(),
        vec![
            (256, 256),
            (256, 256),
            (88, 256),
            (256, 256),
            (256, 256),
            (88, 256),
            (256, 88),
            (256, 88),
            (88, 88)
        ]
    );
    assert!(tiles.iter().all(|t| t.source_name == "ortho.tif"));
    assert!(tiles
        .iter()
        .all(|t| t.pixel_x_size == 0.5 && t.pixel_y_size == 0.5));

    let last = tiles[8].bounds().unwrap();
    assert_eq!(
        last,
        BoundingBox2D::new((266.0, -250.0).into(), (310.0, -206.0).into()).unwrap()
    );

    for tile in &tiles {
        let blob = store.tile_blob(&report.tables, tile.id).unwrap().unwrap();
        assert!(blob.starts_with(b"II*\0") || blob.starts_with(b"MM\0*"));
    }

    assert_eq!(store.geometry_column_srid("ortho_metadata").unwrap(), Some(4326));
    assert_eq!(store.spatial_reference_srid(4326).unwrap(), Some(4326));
    assert_eq!(store.row_count("idx_ortho_metadata_geometry").unwrap(), 9);
}

#[test]
fn it_covers_the_raster_without_gaps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cover.sqlite");
    let source = ortho(300, 170);

    let report = copy_raw(
        &target(&path, None),
        &source,
        &options(&[("BLOCKXSIZE", "128"), ("BLOCKYSIZE", "64")]),
        &RawEncoder::new(),
    )
    .unwrap();

    let bounds = tile_bounds(&report.store.tile_metadata(&report.tables).unwrap());
    assert_eq!(bounds.len(), 9);

    let mut union = bounds[0];
    for tile_bounds in &bounds[1..] {
        union.extend_with_bbox(tile_bounds);
    }
    assert_eq!(union, report.bounds);
    assert_eq!(
        report.bounds,
        BoundingBox2D::new((10.0, -35.0).into(), (160.0, 50.0).into()).unwrap()
    );

    let area: f64 = bounds.iter().map(BoundingBox2D::area).sum();
    assert_relative_eq!(area, report.bounds.area());

    for (i, a) in bounds.iter().enumerate() {
        for b in &bounds[i + 1..] {
            let shared = a.intersection(b).map_or(0.0, |overlap| overlap.area());
            assert_relative_eq!(shared, 0.0);
        }
    }
}

#[test]
fn it_stores_a_single_tile_when_untiled() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("single.sqlite");

    let report = copy_raw(
        &target(&path, None),
        &ortho(600, 450),
        &options(&[("TILED", "NO")]),
        &RawEncoder::new(),
    )
    .unwrap();

    let tiles = report.store.tile_metadata(&report.tables).unwrap();
    assert_eq!(tiles.len(), 1);
    assert_eq!((tiles[0].width, tiles[0].height), (600, 450));
    assert_eq!(tiles[0].bounds().unwrap(), report.bounds);
}

#[test]
fn it_uses_the_identity_transform_without_georeference() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.sqlite");
    let source = MemoryRaster::from_fn(100, 80, |_, _| 0);

    let report = copy_raw(
        &target(&path, None),
        &source,
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    )
    .unwrap();

    assert_eq!(report.srid, -1);
    assert_eq!(
        report.bounds,
        BoundingBox2D::new((0.0, -80.0).into(), (100.0, 0.0).into()).unwrap()
    );
}

#[test]
fn it_requires_a_table_for_an_existing_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.sqlite");
    let source = ortho(100, 100);

    copy_raw(
        &target(&path, None),
        &source,
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    )
    .unwrap();

    let result = copy_raw(
        &target(&path, None),
        &source,
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    );

    let error = result.unwrap_err();
    assert!(matches!(error, Error::AmbiguousTargetTable { .. }));
    assert_eq!(error.category(), ErrorCategory::Configuration);

    let report = copy_raw(
        &target(&path, Some("second")),
        &source,
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    )
    .unwrap();
    assert_eq!(report.tables.prefix(), "second");
    assert!(report.store.table_exists("existing_metadata").unwrap());
}

#[test]
fn it_appends_and_reports_overlaps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("append.sqlite");
    let source = ortho(300, 300);
    let target = target(&path, Some("ortho"));

    let first = copy_raw(&target, &source, &CreateCopyOptions::default(), &RawEncoder::new())
        .unwrap();
    assert_eq!(first.overlapping_tiles, 0);
    drop(first);

    let second = copy_raw(&target, &source, &CreateCopyOptions::default(), &RawEncoder::new())
        .unwrap();
    assert_eq!(second.overlapping_tiles, 4);
    assert_eq!(second.store.row_count("ortho_metadata").unwrap(), 8);
    assert_eq!(second.store.row_count("ortho_rasters").unwrap(), 8);
}

#[test]
fn it_wipes_existing_tiles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wipe.sqlite");
    let source = ortho(300, 300);
    let target = target(&path, Some("ortho"));
    let wipe = options(&[("WIPE", "YES")]);

    for _ in 0..2 {
        let report = copy_raw(&target, &source, &wipe, &RawEncoder::new()).unwrap();

        assert_eq!(report.overlapping_tiles, 0);
        assert_eq!(report.store.row_count("ortho_metadata").unwrap(), 4);
        assert_eq!(report.store.row_count("ortho_rasters").unwrap(), 4);
        assert_eq!(
            report.store.row_count("idx_ortho_metadata_geometry").unwrap(),
            4
        );
    }
}

#[test]
fn it_leaves_no_tiles_of_a_failed_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("atomic.sqlite");
    let source = ortho(600, 600);
    let target = target(&path, Some("ortho"));

    let before = copy_raw(&target, &source, &CreateCopyOptions::default(), &RawEncoder::new())
        .unwrap()
        .store
        .tile_metadata(&TileTables::new("ortho"))
        .unwrap();
    assert_eq!(before.len(), 9);

    let encoder = RawEncoder::failing_on(4);
    let error = copy_raw(&target, &source, &CreateCopyOptions::default(), &encoder).unwrap_err();

    assert!(matches!(error, Error::Encode { .. }));
    assert_eq!(error.category(), ErrorCategory::Encode);
    assert_eq!(encoder.calls.get(), 5);

    let store = TileStore::open(&path, OpenMode::ReadOnly, StoreSettings::default()).unwrap();
    assert_eq!(
        store.tile_metadata(&TileTables::new("ortho")).unwrap(),
        before
    );
    assert_eq!(store.row_count("ortho_rasters").unwrap(), 9);
    assert_eq!(store.row_count("idx_ortho_metadata_geometry").unwrap(), 9);
}

#[test]
fn it_rejects_a_different_reference_system() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("srs.sqlite");
    let target = target(&path, Some("ortho"));

    copy_raw(
        &target,
        &ortho(100, 100),
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    )
    .unwrap();

    let utm = ortho(100, 100).with_projection(UTM_32N_WKT);
    let error = copy_raw(&target, &utm, &CreateCopyOptions::default(), &RawEncoder::new())
        .unwrap_err();

    assert!(matches!(
        error,
        Error::SridMismatch {
            existing_srid: 4326,
            srid: 32632,
            ..
        }
    ));
    assert_eq!(error.category(), ErrorCategory::Schema);

    let store = TileStore::open(&path, OpenMode::ReadOnly, StoreSettings::default()).unwrap();
    assert_eq!(store.row_count("ortho_metadata").unwrap(), 1);

    let report = copy_raw(
        &target,
        &utm,
        &options(&[("WIPE", "YES")]),
        &RawEncoder::new(),
    )
    .unwrap();
    assert_eq!(report.srid, 32632);
    assert_eq!(
        report.store.geometry_column_srid("ortho_metadata").unwrap(),
        Some(32632)
    );
}

#[test]
fn it_leaves_empty_tables_in_a_store_without_spatial_metadata() {
    let dir = tempdir().unwrap();

    for (name, source) in [
        ("referenced", ortho(100, 100)),
        ("unreferenced", MemoryRaster::from_fn(100, 100, |_, _| 0)),
    ] {
        let path = dir.path().join(format!("{name}.sqlite"));
        rusqlite::Connection::open(&path).unwrap();

        let error = copy_raw(
            &target(&path, Some("ortho")),
            &source,
            &CreateCopyOptions::default(),
            &RawEncoder::new(),
        )
        .unwrap_err();

        assert!(
            matches!(error, Error::MissingSpatialMetadata { .. }),
            "{name}: {error}"
        );
        assert_eq!(error.category(), ErrorCategory::Schema);

        let store = TileStore::open(&path, OpenMode::ReadOnly, StoreSettings::default()).unwrap();
        assert_eq!(store.row_count("ortho_rasters").unwrap(), 0, "{name}");
        assert_eq!(store.row_count("ortho_metadata").unwrap(), 0, "{name}");
    }
}

#[test]
fn it_rejects_sources_without_bands() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.sqlite");
    let source = MemoryRaster::new(10, 10, 0, rasterlite_datatypes::raster::RasterDataType::U8, vec![])
        .unwrap();

    let error = copy_raw(
        &target(&path, None),
        &source,
        &CreateCopyOptions::default(),
        &RawEncoder::new(),
    )
    .unwrap_err();

    assert!(matches!(error, Error::NoBands));
    assert!(!path.exists());
}

#[test]
fn it_copies_a_geotiff_file() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("dem.tif");
    let store_path = dir.path().join("dem.sqlite");

    {
        let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
        let mut dataset = driver
            .create_with_band_type::<i16, _>(&source_path, 200, 100, 1)
            .unwrap();
        dataset.set_geo_transform(&GEO_TRANSFORM).unwrap();
        dataset.set_projection(WGS84_WKT).unwrap();
    }

    let source = GdalSourceRaster::open(&source_path).unwrap();

    let report = create_copy(
        &target(&store_path, None),
        &source,
        &options(&[("DRIVER", "GTiff"), ("COMPRESS", "DEFLATE")]),
        StoreSettings::default(),
        |_, _| true,
    )
    .unwrap();

    assert_eq!(report.tile_count, 1);
    assert_eq!(report.srid, 4326);

    let tiles = report.store.tile_metadata(&report.tables).unwrap();
    assert_eq!((tiles[0].width, tiles[0].height), (200, 100));
    assert_eq!(tiles[0].source_name, source.description());
}
