use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TruckId;
use crate::telemetry::TruckFields;

/// Engine temperature above which a warning is shown.
pub const THERMAL_ALERT_CELSIUS: f64 = 95.0;
/// Engine temperature above which the controller raises a fault.
pub const THERMAL_CRITICAL_CELSIUS: f64 = 120.0;
/// Range reading under which a faulted truck is assumed to face an obstacle.
pub const OBSTACLE_RANGE_METERS: f64 = 8.0;

/// Display color assigned to a truck, derived from its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TruckColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TruckColor {
    const PALETTE: [TruckColor; 3] = [
        TruckColor::rgb(241, 196, 15),
        TruckColor::rgb(255, 165, 0),
        TruckColor::rgb(148, 0, 211),
    ];

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn for_truck(id: TruckId) -> Self {
        Self::PALETTE[id.as_u32() as usize % Self::PALETTE.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermalStatus {
    Normal,
    Alert,
    Critical,
}

/// Reconciled view of one truck.
///
/// `id` and `color` are fixed at creation; everything else follows the
/// telemetry and status streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckState {
    id: TruckId,
    color: TruckColor,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub velocity: f64,
    pub temperature: f64,
    pub lidar: f64,
    pub auto_mode: bool,
    pub fault: bool,
    pub last_update: Option<DateTime<Utc>>,
}

impl TruckState {
    pub fn new(id: TruckId) -> Self {
        Self {
            id,
            color: TruckColor::for_truck(id),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            velocity: 0.0,
            temperature: 0.0,
            lidar: 0.0,
            auto_mode: true,
            fault: false,
            last_update: None,
        }
    }

    pub fn id(&self) -> TruckId {
        self.id
    }

    pub fn color(&self) -> TruckColor {
        self.color
    }

    /// Overlay the reported fields; anything not reported keeps its value.
    pub fn merge(&mut self, fields: &TruckFields, at: DateTime<Utc>) {
        if let Some(x) = fields.x {
            self.x = x;
        }
        if let Some(y) = fields.y {
            self.y = y;
        }
        if let Some(angle) = fields.angle {
            self.angle = angle;
        }
        if let Some(velocity) = fields.velocity {
            self.velocity = velocity;
        }
        if let Some(temperature) = fields.temperature {
            self.temperature = temperature;
        }
        if let Some(lidar) = fields.lidar {
            self.lidar = lidar;
        }
        // Producers rarely resend these two; omission never resets them.
        if let Some(fault) = fields.fault {
            self.fault = fault;
        }
        if let Some(auto_mode) = fields.auto_mode {
            self.auto_mode = auto_mode;
        }
        self.last_update = Some(at);
    }

    pub fn apply_status(&mut self, manual: bool, fault: bool) {
        self.auto_mode = !manual;
        self.fault = fault;
    }

    pub fn is_default(&self) -> bool {
        *self == Self::new(self.id)
    }

    pub fn thermal_status(&self) -> ThermalStatus {
        if self.temperature > THERMAL_CRITICAL_CELSIUS {
            ThermalStatus::Critical
        } else if self.temperature > THERMAL_ALERT_CELSIUS {
            ThermalStatus::Alert
        } else {
            ThermalStatus::Normal
        }
    }

    pub fn obstacle_suspected(&self) -> bool {
        self.fault && self.lidar < OBSTACLE_RANGE_METERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_auto_and_healthy() {
        let truck = TruckState::new(TruckId(4));
        assert!(truck.auto_mode);
        assert!(!truck.fault);
        assert_eq!(truck.x, 0.0);
        assert_eq!(truck.last_update, None);
        assert_eq!(truck.color(), TruckColor::for_truck(TruckId(1)));
    }

    #[test]
    fn merge_keeps_omitted_flags() {
        let mut truck = TruckState::new(TruckId(0));
        let now = Utc::now();
        truck.merge(
            &TruckFields {
                fault: Some(true),
                auto_mode: Some(false),
                ..Default::default()
            },
            now,
        );
        truck.merge(
            &TruckFields {
                x: Some(3.0),
                ..Default::default()
            },
            now,
        );
        assert!(truck.fault);
        assert!(!truck.auto_mode);
        assert_eq!(truck.x, 3.0);
    }

    #[test]
    fn thermal_thresholds_are_exclusive() {
        let mut truck = TruckState::new(TruckId(0));
        truck.temperature = 95.0;
        assert_eq!(truck.thermal_status(), ThermalStatus::Normal);
        truck.temperature = 95.5;
        assert_eq!(truck.thermal_status(), ThermalStatus::Alert);
        truck.temperature = 121.0;
        assert_eq!(truck.thermal_status(), ThermalStatus::Critical);
    }

    #[test]
    fn obstacle_requires_fault() {
        let mut truck = TruckState::new(TruckId(0));
        truck.lidar = 2.0;
        assert!(!truck.obstacle_suspected());
        truck.fault = true;
        assert!(truck.obstacle_suspected());
    }
}
