//! Command-line front end: copies a GDAL-readable raster into a tile store.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use rasterlite_ingest::options::parse_key_value_pair;
use rasterlite_ingest::{create_copy, CopyReport, CreateCopyOptions, GdalSourceRaster, StoreSettings};
use tracing::info;

pub mod config;
pub mod error;
pub mod logging;

use crate::config::{get_config_element, Logging};
use crate::error::Result;

/// Copies a raster into the tile tables of a `SQLite` tile store
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct CopyArgs {
    /// Raster file readable by GDAL
    pub source: PathBuf,

    /// Tile store and table prefix: `[RASTERLITE:]STORE_PATH[,table=NAME]`
    pub target: String,

    /// Creation option, e.g. `DRIVER=JPEG`, `BLOCKXSIZE=512` or `WIPE=YES`. May be repeated.
    #[arg(long = "co", value_name = "KEY=VALUE", value_parser = parse_creation_option)]
    pub creation_options: Vec<(String, String)>,

    /// Do not log progress
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_creation_option(input: &str) -> Result<(String, String), String> {
    parse_key_value_pair(input).map_err(|e| e.to_string())
}

/// Accepts GDAL's single-dash spelling `-co` for `--co`
pub fn gdal_style_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| if arg == "-co" { "--co".into() } else { arg })
        .collect()
}

/// Sets up logging from the settings and performs the copy
pub fn run(args: &CopyArgs) -> Result<CopyReport> {
    let logging: Logging = get_config_element()?;
    logging::init_logging(&logging)?;

    copy(args)
}

/// Copies the source of `args` into its target, with the creation options of `args` layered over the settings
pub fn copy(args: &CopyArgs) -> Result<CopyReport> {
    let store_settings: StoreSettings = get_config_element()?;
    let mut options: CreateCopyOptions = get_config_element()?;
    options.merge_key_value_pairs(args.creation_options.iter().map(|(k, v)| (k, v)))?;

    let source = GdalSourceRaster::open(&args.source)?;

    let mut progress = ProgressLog::new(args.quiet);
    let report = create_copy(
        &args.target,
        &source,
        &options,
        store_settings,
        |fraction, _message| {
            progress.update(fraction);
            true
        },
    )?;

    info!(
        "{} tiles written into table {} of {}",
        report.tile_count,
        report.tables.prefix(),
        report.store.path().display()
    );

    Ok(report)
}

/// Logs progress in steps of ten percent
#[derive(Debug)]
struct ProgressLog {
    quiet: bool,
    logged_steps: u32,
}

impl ProgressLog {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            logged_steps: 0,
        }
    }

    /// Returns the step that was logged, if any
    fn update(&mut self, fraction: f64) -> Option<u32> {
        let steps = (fraction.clamp(0.0, 1.0) * 10.0).floor() as u32;

        if self.quiet || steps <= self.logged_steps {
            return None;
        }

        self.logged_steps = steps;
        info!("{}% done", steps * 10);
        Some(steps)
    }
}
