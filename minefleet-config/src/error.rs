use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ConfigGuardRailError;

/// Errors raised while composing the effective configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value `{value}` for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
