use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("fleet.size must be at least 1")]
    EmptyFleet,
    #[error("console.tick_hz must be at least 1")]
    ZeroTickRate,
    #[error("route.{field} must be a positive number, got {value}")]
    NonPositiveRouteValue { field: &'static str, value: f64 },
    #[error("route.bounds must have positive width and height")]
    InvalidBounds,
    #[error("workers.{field} must not be empty")]
    EmptyWorkerSetting { field: &'static str },
    #[error("framed.max_frame_len must be at least 1")]
    ZeroFrameLimit,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    if config.fleet.size == 0 {
        return Err(ConfigGuardRailError::EmptyFleet);
    }
    if config.console.tick_hz == 0 {
        return Err(ConfigGuardRailError::ZeroTickRate);
    }
    if config.framed.max_frame_len == 0 {
        return Err(ConfigGuardRailError::ZeroFrameLimit);
    }

    for (field, value) in [
        ("cell_size", config.route.cell_size),
        ("cruise_speed", config.route.cruise_speed),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigGuardRailError::NonPositiveRouteValue {
                field,
                value,
            });
        }
    }
    if let Some(bounds) = config.route.bounds
        && !(bounds.width > 0.0 && bounds.height > 0.0)
    {
        return Err(ConfigGuardRailError::InvalidBounds);
    }

    let workers = &config.workers;
    if workers.runtime.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyWorkerSetting {
            field: "runtime",
        });
    }
    if workers.image.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyWorkerSetting { field: "image" });
    }
    if workers.simulator_command.is_empty() {
        return Err(ConfigGuardRailError::EmptyWorkerSetting {
            field: "simulator_command",
        });
    }
    if workers.controller_command.is_empty() {
        return Err(ConfigGuardRailError::EmptyWorkerSetting {
            field: "controller_command",
        });
    }

    if workers.visualizers.is_empty() {
        warnings.push_with_hint(
            "No visualizers configured; the simulation will run headless",
            "Add entries to workers.visualizers to open the cockpit views",
        );
    }
    if workers.settle_delay.is_zero() {
        warnings.push(
            "workers.settle_delay_ms is 0; controllers may start before the simulator is ready",
        );
    }
    if workers.terminals.is_empty() && !workers.visualizers.is_empty() {
        warnings.push_with_hint(
            "No terminal emulators configured; visualizers run as detached containers",
            "Set workers.terminals to e.g. [\"gnome-terminal\", \"xterm\"]",
        );
    }
    if config.fleet.size > 16 {
        warnings.push(format!(
            "fleet.size is {}; each truck launches its own controller container",
            config.fleet.size
        ));
    }

    Ok(warnings)
}
