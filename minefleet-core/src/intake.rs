use std::sync::Arc;

use minefleet_model::{
    FramedStateFrame, MapGrid, StatusUpdate, TelemetryUpdate, TruckId,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DecodeError;
use crate::store::FleetStateStore;
use crate::telemetry::{InboundHandler, Topic};

/// Decodes inbound payloads and applies them to the store.
///
/// Malformed payloads are logged and dropped; nothing propagates past
/// this boundary.
#[derive(Debug, Clone)]
pub struct TelemetryIntake {
    store: Arc<FleetStateStore>,
}

impl TelemetryIntake {
    pub fn new(store: Arc<FleetStateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<FleetStateStore> {
        &self.store
    }

    pub fn ingest(
        &self,
        topic: Topic,
        payload: &[u8],
    ) -> Result<(), DecodeError> {
        match topic {
            Topic::SensorTelemetry => {
                let update: TelemetryUpdate = decode(topic, payload)?;
                self.store.apply_telemetry(&update);
            }
            Topic::SystemStatus => {
                let status: StatusUpdate = decode(topic, payload)?;
                self.store.apply_status(&status);
            }
            Topic::MapData => {
                let value: Value = decode(topic, payload)?;
                let grid = map_from_value(&value)?;
                info!(
                    width = grid.width(),
                    height = grid.height(),
                    "map received"
                );
                self.store.set_map(grid);
            }
            Topic::RouteDispatch => {
                debug!("ignoring echoed route dispatch");
            }
        }
        Ok(())
    }

    pub fn ingest_state_frame(
        &self,
        truck: TruckId,
        payload: &[u8],
    ) -> Result<(), DecodeError> {
        let frame: FramedStateFrame = serde_json::from_slice(payload)
            .map_err(|source| DecodeError::Json {
                topic: "state-frame",
                source,
            })?;
        if let Some(map) = frame.map.as_ref() {
            let grid = MapGrid::from_json_rows(map)?;
            info!(%truck, "map received over framed link");
            self.store.set_map(grid);
        }
        self.store.apply_telemetry(&frame.truck.into_update(truck));
        Ok(())
    }
}

impl InboundHandler for TelemetryIntake {
    fn on_message(&self, topic: Topic, payload: &[u8]) {
        if let Err(err) = self.ingest(topic, payload) {
            warn!(%topic, error = %err, "dropping inbound message");
        }
    }

    fn on_state_frame(&self, truck: TruckId, payload: &[u8]) {
        if let Err(err) = self.ingest_state_frame(truck, payload) {
            warn!(%truck, error = %err, "dropping state frame");
        }
    }

    fn on_disconnect(&self) {
        debug!("telemetry source disconnected");
    }
}

fn decode<T: DeserializeOwned>(
    topic: Topic,
    payload: &[u8],
) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|source| DecodeError::Json {
        topic: topic.as_str(),
        source,
    })
}

/// `{"map": rows}` or a bare array of rows.
fn map_from_value(value: &Value) -> Result<MapGrid, DecodeError> {
    let rows = match value {
        Value::Array(_) => value,
        Value::Object(fields) => {
            fields.get("map").ok_or(DecodeError::MissingMap)?
        }
        _ => return Err(DecodeError::MissingMap),
    };
    Ok(MapGrid::from_json_rows(rows)?)
}
