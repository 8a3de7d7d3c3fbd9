use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("Cannot load settings: {reason}"))]
    LoadSettings { reason: String },

    #[snafu(display("Invalid setting: {source}"))]
    Config { source: config::ConfigError },

    #[snafu(display("Invalid log spec: {source}"))]
    LogSpec {
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("Cannot initialize logging: {source}"))]
    InitLogging {
        source: tracing_subscriber::util::TryInitError,
    },

    #[snafu(display("{source}"))]
    Ingest { source: rasterlite_ingest::Error },
}

impl From<rasterlite_ingest::Error> for Error {
    fn from(source: rasterlite_ingest::Error) -> Self {
        Self::Ingest { source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
