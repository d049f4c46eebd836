//! Fleet state synchronization and worker supervision for the minefleet
//! operator console.
//!
//! The [`FleetController`] is the composition root: it owns the
//! [`FleetStateStore`], the [`RoutePlanner`], a [`TelemetryChannel`] and the
//! [`ProcessSupervisor`], and turns operator intents into calls on them.
#![allow(missing_docs)]

pub mod cockpit;
pub mod controller;
pub mod error;
pub mod intake;
pub mod planner;
pub mod store;
pub mod supervisor;
pub mod telemetry;

pub use cockpit::{CockpitAction, CockpitSession, ControlKey, ManualControl};
pub use controller::{
    ConsoleSnapshot, FleetController, NoticeLevel, OperatorNotice,
};
pub use error::{
    DecodeError, DispatchError, FleetError, FrameError, Result,
    SupervisionError, TransportError,
};
pub use intake::TelemetryIntake;
pub use planner::RoutePlanner;
pub use store::FleetStateStore;
pub use supervisor::{
    ContainerRuntime, DockerRuntime, ProcessSupervisor, StartTicket,
    SupervisionPhase, SupervisorTiming, WorkerHandle, WorkerOutput,
    WorkerPlan, WorkerRole, WorkerSpec,
};
pub use telemetry::{
    InboundHandler, TelemetryChannel, Topic, TopicMap,
    framed::{FrameReader, FrameWriter, FramedChannel},
    pubsub::RedisChannel,
};
