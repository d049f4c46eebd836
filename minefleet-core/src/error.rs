use std::io;
use std::path::PathBuf;

use minefleet_model::{ModelError, TruckId};
use thiserror::Error;

/// Failure of the point-to-point framing layer.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream, possibly in the middle of a frame.
    #[error("framed link disconnected")]
    Disconnected,
    #[error("frame exceeds the {max} byte limit")]
    TooLarge { max: usize },
    #[error("framed link i/o error")]
    Io(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telemetry channel is not connected")]
    NotConnected,
    #[error("broker error")]
    Broker(#[from] redis::RedisError),
    #[error("failed to connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("failed to encode outbound message")]
    Encode(#[from] serde_json::Error),
    #[error("failed to encode command")]
    Command(#[from] ModelError),
}

/// Inbound payload that could not be applied.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {topic} payload")]
    Json {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("map payload carries no grid")]
    MissingMap,
    #[error("invalid map grid")]
    Map(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("route for truck {truck} is empty")]
    EmptyRoute { truck: TruckId },
    #[error("telemetry channel is not connected")]
    NotConnected,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum SupervisionError {
    #[error("failed to run `{command}`")]
    Runtime {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn `{program}` for worker {worker}")]
    Spawn {
        worker: String,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
    #[error("failed to open worker log {path}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("telemetry channel unavailable")]
    Channel(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Supervision(#[from] SupervisionError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, FleetError>;
