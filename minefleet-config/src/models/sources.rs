use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{MapBounds, TopicNames};
use crate::util::non_empty_var;

/// Raw configuration as written in `minefleet.toml`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub fleet: FileFleetConfig,
    #[serde(default)]
    pub broker: FileBrokerConfig,
    #[serde(default)]
    pub route: FileRouteConfig,
    #[serde(default)]
    pub workers: FileWorkersConfig,
    #[serde(default)]
    pub framed: FileFramedConfig,
    #[serde(default)]
    pub console: FileConsoleConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileFleetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileBrokerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<TopicNames>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRouteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cruise_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<MapBounds>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileWorkersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulator_command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualizers: Option<Vec<Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_grace_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminals: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileFramedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truck_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frame_len: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileConsoleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_hz: Option<u32>,
}

/// Raw environment overrides.
///
/// Numeric values are kept as text so the loader can report the offending
/// variable instead of silently ignoring it.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub broker_url: Option<String>,
    pub fleet_size: Option<String>,
    pub worker_image: Option<String>,
    pub container_runtime: Option<String>,
    pub framed_addr: Option<String>,
    pub tick_hz: Option<String>,
    pub worker_log_dir: Option<PathBuf>,
    pub settle_delay: Option<String>,
    pub stop_grace: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("MINEFLEET_CONFIG_PATH")
                .map(PathBuf::from),
            broker_url: non_empty_var("MINEFLEET_BROKER_URL"),
            fleet_size: non_empty_var("MINEFLEET_FLEET_SIZE"),
            worker_image: non_empty_var("MINEFLEET_WORKER_IMAGE"),
            container_runtime: non_empty_var("MINEFLEET_CONTAINER_RUNTIME"),
            framed_addr: non_empty_var("MINEFLEET_FRAMED_ADDR"),
            tick_hz: non_empty_var("MINEFLEET_TICK_HZ"),
            worker_log_dir: non_empty_var("MINEFLEET_WORKER_LOG_DIR")
                .map(PathBuf::from),
            settle_delay: non_empty_var("MINEFLEET_SETTLE_DELAY"),
            stop_grace: non_empty_var("MINEFLEET_STOP_GRACE"),
        }
    }
}
