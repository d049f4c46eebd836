use serde::{Deserialize, Serialize};

use crate::ids::TruckId;

/// A planned stop on the mine floor, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Snap a raw point to the center of the grid cell containing it.
    pub fn snapped(x: f64, y: f64, cell_size: f64) -> Self {
        let half = cell_size / 2.0;
        Self {
            x: (x / cell_size).floor() * cell_size + half,
            y: (y / cell_size).floor() * cell_size + half,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteWaypoint {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

/// Outbound `route-dispatch` command: the whole ordered route for one truck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDispatch {
    pub id: TruckId,
    pub route: Vec<RouteWaypoint>,
}

impl RouteDispatch {
    pub fn new(id: TruckId, waypoints: &[Waypoint], speed: f64) -> Self {
        Self {
            id,
            route: waypoints
                .iter()
                .map(|point| RouteWaypoint {
                    x: point.x,
                    y: point.y,
                    speed,
                })
                .collect(),
        }
    }
}
