use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a truck for the lifetime of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct TruckId(pub u32);

impl TruckId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Iterate the ids of a fleet of `size` trucks, `0..size`.
    pub fn fleet(size: u32) -> impl Iterator<Item = TruckId> {
        (0..size).map(TruckId)
    }
}

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TruckId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
