use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigLoadError;
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    BrokerConfig, Config, ConfigMetadata, ConsoleConfig, FleetConfig,
    FramedConfig, RouteConfig, WorkersConfig,
};
use crate::util::parse_duration;
use crate::validation::{self, ConfigWarnings};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["minefleet.toml", "config/minefleet.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment and compose the config.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        let env_file_loaded = match loaded {
            Ok(flag) => flag,
            Err(dotenvy::Error::Io(_)) => false,
            Err(err) => return Err(err.into()),
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose the config from an already gathered environment.
    ///
    /// Does not touch the process environment, so tests can drive every
    /// override without `set_var`.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No minefleet.toml detected; using built-in defaults and environment overrides",
                "Create minefleet.toml or pass --config to customise workers and topics",
            );
        }

        let config = compose(file_config.unwrap_or_default(), env, config_path)?;
        warnings.extend(validation::apply_guard_rails(&config)?);

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let requested = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match requested {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
        tracing::debug!(path = %path.display(), "loaded config file");

        Ok((Some(file_config), Some(path)))
    }
}

fn compose(
    file: FileConfig,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<Config, ConfigLoadError> {
    let FileConfig {
        fleet: file_fleet,
        broker: file_broker,
        route: file_route,
        workers: file_workers,
        framed: file_framed,
        console: file_console,
    } = file;

    let fleet_defaults = FleetConfig::default();
    let fleet = FleetConfig {
        size: parse_env("MINEFLEET_FLEET_SIZE", env.fleet_size.as_deref())?
            .or(file_fleet.size)
            .unwrap_or(fleet_defaults.size),
    };

    let broker_defaults = BrokerConfig::default();
    let broker = BrokerConfig {
        url: env
            .broker_url
            .or(file_broker.url)
            .unwrap_or(broker_defaults.url),
        topics: file_broker.topics.unwrap_or(broker_defaults.topics),
    };

    let route_defaults = RouteConfig::default();
    let route = RouteConfig {
        cell_size: file_route.cell_size.unwrap_or(route_defaults.cell_size),
        cruise_speed: file_route
            .cruise_speed
            .unwrap_or(route_defaults.cruise_speed),
        bounds: file_route.bounds.or(route_defaults.bounds),
    };

    let defaults = WorkersConfig::default();
    let settle_delay = env_duration("MINEFLEET_SETTLE_DELAY", env.settle_delay)?
        .or(file_workers.settle_delay_ms.map(Duration::from_millis))
        .unwrap_or(defaults.settle_delay);
    let stop_grace = env_duration("MINEFLEET_STOP_GRACE", env.stop_grace)?
        .or(file_workers.stop_grace_ms.map(Duration::from_millis))
        .unwrap_or(defaults.stop_grace);
    let workers = WorkersConfig {
        runtime: env
            .container_runtime
            .or(file_workers.runtime)
            .unwrap_or(defaults.runtime),
        image: env
            .worker_image
            .or(file_workers.image)
            .unwrap_or(defaults.image),
        run_args: file_workers.run_args.unwrap_or(defaults.run_args),
        simulator_command: file_workers
            .simulator_command
            .unwrap_or(defaults.simulator_command),
        controller_command: file_workers
            .controller_command
            .unwrap_or(defaults.controller_command),
        visualizers: file_workers.visualizers.unwrap_or(defaults.visualizers),
        settle_delay,
        stop_grace,
        log_dir: env
            .worker_log_dir
            .or(file_workers.log_dir)
            .unwrap_or(defaults.log_dir),
        terminals: file_workers.terminals.unwrap_or(defaults.terminals),
    };

    let framed_defaults = FramedConfig::default();
    let framed = FramedConfig {
        addr: env
            .framed_addr
            .or(file_framed.addr)
            .unwrap_or(framed_defaults.addr),
        truck_id: file_framed.truck_id.unwrap_or(framed_defaults.truck_id),
        max_frame_len: file_framed
            .max_frame_len
            .unwrap_or(framed_defaults.max_frame_len),
    };

    let console = ConsoleConfig {
        tick_hz: parse_env("MINEFLEET_TICK_HZ", env.tick_hz.as_deref())?
            .or(file_console.tick_hz)
            .unwrap_or(ConsoleConfig::default().tick_hz),
    };

    Ok(Config {
        fleet,
        broker,
        route,
        workers,
        framed,
        console,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    })
}

fn parse_env<T>(
    name: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|err| ConfigLoadError::InvalidValue {
                name,
                value: value.to_string(),
                reason: err.to_string(),
            })
    })
    .transpose()
}

fn env_duration(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<Duration>, ConfigLoadError> {
    raw.map(|value| {
        parse_duration(&value).map_err(|reason| {
            ConfigLoadError::InvalidValue {
                name,
                value,
                reason,
            }
        })
    })
    .transpose()
}
