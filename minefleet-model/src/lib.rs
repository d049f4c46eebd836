//! Data model shared by the minefleet crates.
//!
//! Everything here is plain data: truck state and its sparse telemetry
//! updates, planned routes, the mine map grid and the command shapes spoken
//! over the point-to-point link. No I/O happens in this crate.
#![allow(missing_docs)]

pub mod command;
pub mod error;
pub mod ids;
pub mod map;
pub mod route;
pub mod telemetry;
pub mod truck;

pub use command::{DriveMode, FaultKind, TruckCommand};
pub use error::{ModelError, Result as ModelResult};
pub use ids::TruckId;
pub use map::{MapCell, MapGrid};
pub use route::{RouteDispatch, RouteWaypoint, Waypoint};
pub use telemetry::{
    FramedStateFrame, StatusUpdate, TelemetryUpdate, TruckFields,
};
pub use truck::{ThermalStatus, TruckColor, TruckState};
