//! Transport-agnostic telemetry bus.
//!
//! Two transports implement [`TelemetryChannel`]: [`pubsub::RedisChannel`]
//! for the broker-backed fleet and [`framed::FramedChannel`] for the
//! single-truck point-to-point link.

pub mod framed;
pub mod pubsub;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use minefleet_config::TopicNames;
use minefleet_model::TruckId;

use crate::error::TransportError;

/// Logical message classes carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SensorTelemetry,
    MapData,
    SystemStatus,
    RouteDispatch,
}

impl Topic {
    /// Topics the console subscribes to.
    pub const INBOUND: [Topic; 3] =
        [Topic::SensorTelemetry, Topic::MapData, Topic::SystemStatus];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::SensorTelemetry => "sensor-telemetry",
            Topic::MapData => "map-data",
            Topic::SystemStatus => "system-status",
            Topic::RouteDispatch => "route-dispatch",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps logical topics to the channel names used on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMap {
    names: TopicNames,
}

impl TopicMap {
    pub fn new(names: TopicNames) -> Self {
        Self { names }
    }

    pub fn name(&self, topic: Topic) -> &str {
        match topic {
            Topic::SensorTelemetry => &self.names.sensor_telemetry,
            Topic::MapData => &self.names.map_data,
            Topic::SystemStatus => &self.names.system_status,
            Topic::RouteDispatch => &self.names.route_dispatch,
        }
    }

    pub fn resolve(&self, channel: &str) -> Option<Topic> {
        [
            Topic::SensorTelemetry,
            Topic::MapData,
            Topic::SystemStatus,
            Topic::RouteDispatch,
        ]
        .into_iter()
        .find(|topic| self.name(*topic) == channel)
    }
}

/// Receives inbound traffic from a connected channel.
///
/// Called from the transport's reader task; implementations must not block.
pub trait InboundHandler: Send + Sync {
    fn on_message(&self, topic: Topic, payload: &[u8]);

    /// State frame from the point-to-point link, addressed to `truck`.
    fn on_state_frame(&self, truck: TruckId, payload: &[u8]);

    fn on_disconnect(&self) {}
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    /// Attach to the transport and start delivering inbound traffic to
    /// `handler`. Connecting an already connected channel is a no-op.
    async fn connect(
        &self,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Fire-and-forget delivery; no acknowledgement is awaited.
    async fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    async fn disconnect(&self);
}
