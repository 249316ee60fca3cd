pub mod cli;
#[allow(clippy::module_inception)]
pub mod config;
pub mod database;
pub mod routes;
pub mod types;

use std::path::PathBuf;
use thiserror::Error;

pub use cli::{CliConfig, Command};
pub use config::{Config, GatewaySettings, ServicesSettings, SettlementSettings};
pub use database::DatabaseSettings;
pub use types::{LogLevel, MatchMode, ServiceSelection};

// -----------------------------------------------------------------------------
// ----- Errors ----------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("path is not a file: {path:?}")]
    NotAFile { path: PathBuf },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },

    #[error("invalid or missing field '{0}'")]
    InvalidField(String),

    #[error("invalid socket address for '{field}': '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("invalid duration for '{field}': {source}")]
    InvalidDuration {
        field: String,
        source: humantime::DurationError,
    },

    #[error("no [[routes]] entries configured")]
    EmptyRoutes,

    #[error("duplicate route fragment '{fragment}'")]
    DuplicateFragment { fragment: String },

    #[error("route '{route}' has port 0")]
    InvalidPort { route: String },
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
