use std::path::Path;
use std::sync::LazyLock;

use config::{Config, Environment, File, FileFormat};
use rasterlite_ingest::{CreateCopyOptions, StoreSettings};
use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{self, Error, Result};

const DEFAULT_SETTINGS: &str = include_str!("../Settings-default.toml");

static SETTINGS: LazyLock<Result<Config, config::ConfigError>> = LazyLock::new(init_settings);

/// Defaults shipped with the binary, overridden by `Settings.toml` in the working directory
/// and then by environment variables.
fn init_settings() -> Result<Config, config::ConfigError> {
    let mut settings =
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

    let local_settings = Path::new("Settings.toml");
    if local_settings.exists() {
        settings = settings.add_source(File::from(local_settings));
    }

    // e.g. `RASTERLITE__INGEST__DRIVER=JPEG`
    settings = settings.add_source(Environment::with_prefix("rasterlite").separator("__"));

    settings.build()
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    SETTINGS
        .as_ref()
        .map_err(|e| Error::LoadSettings {
            reason: e.to_string(),
        })?
        .get::<T>(key)
        .context(error::Config)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub log_spec: String,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

impl ConfigElement for StoreSettings {
    const KEY: &'static str = "store";
}

impl ConfigElement for CreateCopyOptions {
    const KEY: &'static str = "ingest";
}
