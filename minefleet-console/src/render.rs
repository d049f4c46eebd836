//! Plain-text presentation of console snapshots.

use std::fmt::Write as _;

use minefleet_core::ConsoleSnapshot;
use minefleet_model::{ThermalStatus, TruckState};

/// One line summarizing the link and supervision state.
pub fn header(snapshot: &ConsoleSnapshot) -> String {
    format!(
        "simulation {}{} | link {} | truck {} selected | route {} waypoint(s)",
        snapshot.phase,
        if snapshot.busy { " (busy)" } else { "" },
        if snapshot.connected { "up" } else { "down" },
        snapshot.selected,
        snapshot.route.len(),
    )
}

pub fn truck_line(truck: &TruckState, selected: bool) -> String {
    let mut line = format!(
        "{} truck {} ({:.1}, {:.1}) {:.0}deg {:.1} m/s {:.1}C {} {}",
        if selected { '*' } else { ' ' },
        truck.id(),
        truck.x,
        truck.y,
        truck.angle,
        truck.velocity,
        truck.temperature,
        if truck.auto_mode { "auto" } else { "manual" },
        if truck.fault { "FAULT" } else { "ok" },
    );
    match truck.thermal_status() {
        ThermalStatus::Normal => {}
        ThermalStatus::Alert => line.push_str(" [temp alert]"),
        ThermalStatus::Critical => line.push_str(" [temp critical]"),
    }
    if truck.obstacle_suspected() {
        let _ = write!(line, " [obstacle {:.1} m]", truck.lidar);
    }
    if truck.last_update.is_none() {
        line.push_str(" (no telemetry)");
    }
    line
}

pub fn status(snapshot: &ConsoleSnapshot) -> String {
    let mut out = header(snapshot);
    match snapshot.map.as_deref() {
        Some(map) => {
            let _ = write!(out, "\nmap {}x{}", map.width(), map.height());
        }
        None => out.push_str("\nno map received"),
    }
    for truck in &snapshot.trucks {
        out.push('\n');
        out.push_str(&truck_line(truck, truck.id() == snapshot.selected));
    }
    for (idx, point) in snapshot.route.iter().enumerate() {
        let _ =
            write!(out, "\n  wp {}: ({:.1}, {:.1})", idx + 1, point.x, point.y);
    }
    out
}
