//! Configuration for the minefleet console.
//!
//! Defaults are layered under an optional TOML file, which is in turn
//! layered under environment variables (optionally read from a `.env`
//! file). The loader returns the composed [`Config`] plus any soft
//! [`ConfigWarnings`]; hard violations surface as [`ConfigLoadError`].
#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use error::ConfigLoadError;
pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    BrokerConfig, Config, ConfigMetadata, ConsoleConfig, FleetConfig,
    FramedConfig, MapBounds, RouteConfig, TopicNames, WorkersConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
