//! Inbound telemetry shapes.
//!
//! Producers only send the fields that changed, so every measurement is
//! optional. Several spellings are accepted for the same field because the
//! simulator, the controllers and the point-to-point link each grew their
//! own vocabulary (`vel` vs `velocity`, `temp` vs `temperature`).

use serde::{Deserialize, Serialize};

use crate::ids::TruckId;

/// Sparse set of truck measurements. `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruckFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, alias = "vel", skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(
        default,
        alias = "temp",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f64>,
    #[serde(
        default,
        alias = "range",
        skip_serializing_if = "Option::is_none"
    )]
    pub lidar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<bool>,
    #[serde(
        default,
        rename = "auto",
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_mode: Option<bool>,
}

impl TruckFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn into_update(self, id: TruckId) -> TelemetryUpdate {
        TelemetryUpdate { id, fields: self }
    }
}

/// One `sensor-telemetry` message addressed to a truck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryUpdate {
    pub id: TruckId,
    #[serde(flatten)]
    pub fields: TruckFields,
}

impl TelemetryUpdate {
    pub fn new(id: TruckId) -> Self {
        Self {
            id,
            fields: TruckFields::default(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.fields.x = Some(x);
        self.fields.y = Some(y);
        self
    }

    pub fn with_fault(mut self, fault: bool) -> Self {
        self.fields.fault = Some(fault);
        self
    }

    pub fn with_auto_mode(mut self, auto_mode: bool) -> Self {
        self.fields.auto_mode = Some(auto_mode);
        self
    }
}

/// One `system-status` message. Both flags are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: TruckId,
    pub manual: bool,
    pub fault: bool,
}

/// State frame pushed by a controller over the point-to-point link.
///
/// The map rows ride along on the first frame only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FramedStateFrame {
    pub truck: TruckFields,
    #[serde(default)]
    pub map: Option<serde_json::Value>,
}
