//! Reconciled per-truck state.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use minefleet_model::{
    MapGrid, StatusUpdate, TelemetryUpdate, TruckId, TruckState,
};
use tracing::{debug, trace};

/// Truck states keyed by id, plus the latest map grid.
///
/// Writers lock a single truck entry at a time; [`snapshot`] copies the
/// states out so presentation never holds a lock across a render.
///
/// [`snapshot`]: FleetStateStore::snapshot
#[derive(Debug, Default)]
pub struct FleetStateStore {
    trucks: DashMap<TruckId, TruckState>,
    map: RwLock<Option<Arc<MapGrid>>>,
}

impl FleetStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-registered with trucks `0..fleet_size` at defaults.
    pub fn with_fleet(fleet_size: u32) -> Self {
        let store = Self::new();
        store.register_fleet(fleet_size);
        store
    }

    /// Merge a sparse update, creating the truck if it has not been seen.
    pub fn apply_telemetry(&self, update: &TelemetryUpdate) {
        self.apply_telemetry_at(update, Utc::now());
    }

    pub fn apply_telemetry_at(
        &self,
        update: &TelemetryUpdate,
        at: DateTime<Utc>,
    ) {
        let mut entry = self
            .trucks
            .entry(update.id)
            .or_insert_with(|| TruckState::new(update.id));
        entry.merge(&update.fields, at);
        trace!(truck = %update.id, "applied telemetry");
    }

    /// Set the mode and fault flags of a known truck.
    ///
    /// Returns `false` and leaves the store untouched for unknown ids.
    pub fn apply_status(&self, status: &StatusUpdate) -> bool {
        match self.trucks.get_mut(&status.id) {
            Some(mut truck) => {
                truck.apply_status(status.manual, status.fault);
                true
            }
            None => {
                debug!(truck = %status.id, "status for unknown truck ignored");
                false
            }
        }
    }

    /// Reset `0..fleet_size` to defaults and drop every other truck.
    ///
    /// Fleet entries are overwritten in place, so a concurrent reader never
    /// sees the fleet missing.
    pub fn reset_all(&self, fleet_size: u32) {
        self.register_fleet(fleet_size);
        self.trucks.retain(|id, _| id.as_u32() < fleet_size);
        debug!(fleet_size, "fleet state reset");
    }

    pub fn snapshot(&self) -> Vec<TruckState> {
        let mut trucks: Vec<TruckState> = self
            .trucks
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        trucks.sort_by_key(TruckState::id);
        trucks
    }

    pub fn get(&self, id: TruckId) -> Option<TruckState> {
        self.trucks.get(&id).map(|truck| truck.clone())
    }

    pub fn len(&self) -> usize {
        self.trucks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trucks.is_empty()
    }

    pub fn set_map(&self, grid: MapGrid) {
        let mut slot =
            self.map.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(grid));
    }

    pub fn map(&self) -> Option<Arc<MapGrid>> {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn register_fleet(&self, fleet_size: u32) {
        for id in TruckId::fleet(fleet_size) {
            self.trucks.insert(id, TruckState::new(id));
        }
    }
}
