//! Effective configuration consumed by the runtime.

pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FLEET_SIZE: u32 = 3;
pub const DEFAULT_BROKER_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_FRAMED_ADDR: &str = "127.0.0.1:65432";
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;
pub const DEFAULT_TICK_HZ: u32 = 30;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub fleet: FleetConfig,
    pub broker: BrokerConfig,
    pub route: RouteConfig,
    pub workers: WorkersConfig,
    pub framed: FramedConfig,
    pub console: ConsoleConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    pub size: u32,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_FLEET_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub url: String,
    pub topics: TopicNames,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BROKER_URL.to_string(),
            topics: TopicNames::default(),
        }
    }
}

/// Channel names on the broker, one per logical topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicNames {
    pub sensor_telemetry: String,
    pub map_data: String,
    pub system_status: String,
    pub route_dispatch: String,
}

impl Default for TopicNames {
    fn default() -> Self {
        Self {
            sensor_telemetry: "caminhao/sensores".to_string(),
            map_data: "caminhao/mapa".to_string(),
            system_status: "caminhao/estado_sistema".to_string(),
            route_dispatch: "caminhao/rota".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub cell_size: f64,
    pub cruise_speed: f64,
    /// Waypoints outside these bounds are refused. `None` accepts anything.
    pub bounds: Option<MapBounds>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            cell_size: 10.0,
            cruise_speed: 20.0,
            bounds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkersConfig {
    /// Container CLI used to run workers (`docker`, `podman`).
    pub runtime: String,
    pub image: String,
    pub run_args: Vec<String>,
    pub simulator_command: Vec<String>,
    /// Controllers receive their truck id as a trailing argument.
    pub controller_command: Vec<String>,
    pub visualizers: Vec<Vec<String>>,
    pub settle_delay: Duration,
    pub stop_grace: Duration,
    pub log_dir: PathBuf,
    /// Terminal emulators tried in order for visualizers.
    pub terminals: Vec<String>,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "atr_cpp".to_string(),
            run_args: vec!["--network=host".into(), "--ipc=host".into()],
            simulator_command: vec!["./bin/simulador".into()],
            controller_command: vec!["./bin/app".into()],
            visualizers: vec![
                vec!["./bin/cockpit".into()],
                vec!["./bin/interface_simulacao".into()],
            ],
            settle_delay: Duration::from_millis(1000),
            stop_grace: Duration::from_millis(2000),
            log_dir: PathBuf::from("logs"),
            terminals: vec!["gnome-terminal".into(), "xterm".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedConfig {
    pub addr: String,
    pub truck_id: u32,
    pub max_frame_len: usize,
}

impl Default for FramedConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_FRAMED_ADDR.to_string(),
            truck_id: 0,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub tick_hz: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
        }
    }
}

impl ConsoleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}
