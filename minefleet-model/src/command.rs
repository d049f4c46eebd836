//! Commands understood by a truck controller on the point-to-point link.

use std::io;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Electric,
    Hydraulic,
}

impl std::str::FromStr for FaultKind {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "electric" => Ok(FaultKind::Electric),
            "hydraulic" => Ok(FaultKind::Hydraulic),
            other => Err(format!("unknown fault kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TruckCommand {
    /// Switch between automatic and manual driving.
    Mode { mode: DriveMode },
    /// Inject a simulated fault.
    Fault { kind: FaultKind },
    /// Re-arm the truck after a fault.
    Reset,
    /// Continuous manual input. `accel` is 0 or 1, `steer` is -1, 0 or 1.
    Control { accel: i8, steer: i8 },
}

impl TruckCommand {
    pub fn neutral_control() -> Self {
        TruckCommand::Control { accel: 0, steer: 0 }
    }

    /// JSON body with `": "` between keys and values.
    ///
    /// Controllers match on `"key": value` substrings.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(48);
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
