#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use minefleet_config::WorkersConfig;
use minefleet_core::{
    ContainerRuntime, FleetStateStore, InboundHandler, ProcessSupervisor,
    SupervisionError, SupervisorTiming, TelemetryChannel, TelemetryIntake,
    Topic, TransportError, WorkerHandle, WorkerPlan, WorkerSpec,
};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::time::Instant;

/// Records every runtime call instead of touching a container CLI.
#[derive(Clone, Default)]
pub struct RecordingRuntime {
    events: Arc<AsyncMutex<Vec<String>>>,
    launches: Arc<AsyncMutex<Vec<(String, Instant)>>>,
    fail_launch_of: Option<String>,
    /// Once set, `fail_launch_of` stops failing.
    launch_recovered: Arc<AtomicBool>,
    fail_once: bool,
    fail_teardown: bool,
    gate: Option<Arc<Notify>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_launch_of(name: &str) -> Self {
        Self {
            fail_launch_of: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Fails the first launch of `name`, then launches it normally.
    pub fn failing_launch_once_of(name: &str) -> Self {
        Self {
            fail_once: true,
            ..Self::failing_launch_of(name)
        }
    }

    pub fn failing_teardown() -> Self {
        Self {
            fail_teardown: true,
            ..Self::default()
        }
    }

    /// Simulator launch blocks until the returned gate is notified.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            },
            gate,
        )
    }

    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }

    pub async fn launch_times(&self) -> Vec<(String, Instant)> {
        self.launches.lock().await.clone()
    }

    async fn record(&self, event: String) {
        self.events.lock().await.push(event);
    }

    fn teardown_result(&self, name: &str) -> Result<(), SupervisionError> {
        if self.fail_teardown {
            Err(SupervisionError::CommandFailed {
                command: format!("teardown {name}"),
                status: "exit status: 1".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn remove_stale(
        &self,
        names: &[String],
    ) -> Result<(), SupervisionError> {
        self.record(format!("remove:{}", names.join(","))).await;
        Ok(())
    }

    async fn launch(
        &self,
        worker: &WorkerSpec,
    ) -> Result<WorkerHandle, SupervisionError> {
        if let Some(gate) = &self.gate
            && worker.name == "simulator"
        {
            gate.notified().await;
        }
        if self.fail_launch_of.as_deref() == Some(worker.name.as_str())
            && !self.launch_recovered.load(Ordering::SeqCst)
        {
            if self.fail_once {
                self.launch_recovered.store(true, Ordering::SeqCst);
            }
            self.record(format!("failed:{}", worker.name)).await;
            return Err(SupervisionError::Spawn {
                worker: worker.name.clone(),
                program: "docker".into(),
                source: io::Error::other("launch refused"),
            });
        }
        self.record(format!("launch:{}", worker.name)).await;
        self.launches
            .lock()
            .await
            .push((worker.name.clone(), Instant::now()));
        Ok(WorkerHandle::new(worker, None))
    }

    async fn stop(
        &self,
        name: &str,
        _grace: Duration,
    ) -> Result<(), SupervisionError> {
        self.record(format!("stop:{name}")).await;
        self.teardown_result(name)
    }

    async fn kill(&self, name: &str) -> Result<(), SupervisionError> {
        self.record(format!("kill:{name}")).await;
        self.teardown_result(name)
    }

    async fn sweep_orphans(&self) -> Result<usize, SupervisionError> {
        self.record("sweep".into()).await;
        if self.fail_teardown {
            return Err(SupervisionError::CommandFailed {
                command: "sweep".into(),
                status: "exit status: 1".into(),
            });
        }
        Ok(0)
    }
}

/// In-memory channel that records outbound traffic.
#[derive(Default)]
pub struct RecordingChannel {
    connected: AtomicBool,
    fail_connect: bool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    published: AsyncMutex<Vec<(Topic, Vec<u8>)>>,
    handler: std::sync::Mutex<Option<Arc<dyn InboundHandler>>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            fail_connect: true,
            ..Self::default()
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub async fn published(&self) -> Vec<(Topic, Vec<u8>)> {
        self.published.lock().await.clone()
    }

    /// Deliver a message as if it arrived from the broker.
    pub fn deliver(&self, topic: Topic, payload: &[u8]) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler.on_message(topic, payload);
        }
    }
}

#[async_trait]
impl TelemetryChannel for RecordingChannel {
    async fn connect(
        &self,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(TransportError::Connect {
                addr: "broker".into(),
                source: io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "refused",
                ),
            });
        }
        *self.handler.lock().unwrap() = Some(handler);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.published.lock().await.push((topic, payload));
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub fn quick_timing() -> SupervisorTiming {
    SupervisorTiming {
        settle_delay: Duration::ZERO,
        stop_grace: Duration::from_millis(10),
    }
}

pub fn supervisor(
    runtime: RecordingRuntime,
    channel: Arc<RecordingChannel>,
    timing: SupervisorTiming,
) -> ProcessSupervisor<RecordingRuntime> {
    let store = Arc::new(FleetStateStore::with_fleet(3));
    ProcessSupervisor::new(
        runtime,
        WorkerPlan::from_config(&WorkersConfig::default(), 3),
        timing,
        channel,
        Arc::new(TelemetryIntake::new(store)),
    )
}

pub const LAUNCH_ORDER: [&str; 6] = [
    "simulator",
    "controller-0",
    "controller-1",
    "controller-2",
    "visualizer",
    "visualizer-2",
];
