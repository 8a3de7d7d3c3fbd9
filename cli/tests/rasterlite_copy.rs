use assert_cmd::prelude::*;

use gdal::DriverManager;
use rasterlite_ingest::{OpenMode, StoreSettings, TileStore, TileTables};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn write_geotiff(path: &Path, width: usize, height: usize) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<u8, _>(path, width, height, 1)
        .unwrap();
    dataset
        .set_geo_transform(&[0.0, 10.0, 0.0, 1000.0, 0.0, -10.0])
        .unwrap();
}

fn rasterlite_copy(working_dir: &Path, args: &[&str]) -> Output {
    Command::cargo_bin("rasterlite-copy")
        .unwrap()
        .current_dir(working_dir)
        .env("RASTERLITE__LOGGING__LOG_SPEC", "info")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn it_copies_a_geotiff() {
    let dir = tempdir().unwrap();
    write_geotiff(&dir.path().join("input.tif"), 150, 100);

    let output = rasterlite_copy(
        dir.path(),
        &["-co", "BLOCKXSIZE=64", "-co", "BLOCKYSIZE=64", "input.tif", "tiles.sqlite"],
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "{stderr}");
    assert!(stderr.contains("100% done"), "{stderr}");
    assert!(stderr.contains("6 tiles written into table tiles"), "{stderr}");

    let store = TileStore::open(
        dir.path().join("tiles.sqlite"),
        OpenMode::ReadOnly,
        StoreSettings::default(),
    )
    .unwrap();
    let tiles = store.tile_metadata(&TileTables::new("tiles")).unwrap();
    assert_eq!(tiles.len(), 6);
    assert!(tiles.iter().all(|tile| tile.pixel_x_size == 10.0));
}

#[test]
fn it_is_quiet() {
    let dir = tempdir().unwrap();
    write_geotiff(&dir.path().join("input.tif"), 64, 64);

    let output = rasterlite_copy(dir.path(), &["--quiet", "input.tif", "tiles.sqlite"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "{stderr}");
    assert!(!stderr.contains("% done"), "{stderr}");
}

#[test]
fn it_takes_defaults_from_the_environment() {
    let dir = tempdir().unwrap();
    write_geotiff(&dir.path().join("input.tif"), 200, 200);

    let output = Command::cargo_bin("rasterlite-copy")
        .unwrap()
        .current_dir(dir.path())
        .env("RASTERLITE__INGEST__TILED", "false")
        .args(["input.tif", "RASTERLITE:tiles.sqlite,table=single"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let store = TileStore::open(
        dir.path().join("tiles.sqlite"),
        OpenMode::ReadOnly,
        StoreSettings::default(),
    )
    .unwrap();
    assert_eq!(store.row_count("single_metadata").unwrap(), 1);
}

#[test]
fn it_fails_for_an_existing_store_without_table() {
    let dir = tempdir().unwrap();
    write_geotiff(&dir.path().join("input.tif"), 64, 64);

    assert!(rasterlite_copy(dir.path(), &["input.tif", "tiles.sqlite"])
        .status
        .success());

    let output = rasterlite_copy(dir.path(), &["input.tif", "tiles.sqlite"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Explicit table name must be specified"));
}

#[test]
fn it_fails_for_a_missing_source() {
    let dir = tempdir().unwrap();

    let output = rasterlite_copy(dir.path(), &["missing.tif", "tiles.sqlite"]);

    assert!(!output.status.success());
    assert!(!dir.path().join("tiles.sqlite").exists());
}

#[test]
fn it_rejects_the_memory_driver() {
    let dir = tempdir().unwrap();
    write_geotiff(&dir.path().join("input.tif"), 64, 64);

    let output = rasterlite_copy(dir.path(), &["-co", "DRIVER=MEM", "input.tif", "tiles.sqlite"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used as underlying driver"));
    assert!(!dir.path().join("tiles.sqlite").exists());
}
