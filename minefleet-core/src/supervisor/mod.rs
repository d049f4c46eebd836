//! Lifecycle of the external worker processes.
//!
//! One start launches a simulator, one controller per truck and the
//! visualizers, in that order. Start and stop each run to completion on
//! their own task; the atomic [`SupervisionPhase`] is the only thing the
//! console loop needs to look at.

mod phase;
mod runtime;
pub mod spec;
mod worker;

pub use phase::{StartTicket, SupervisionPhase};
pub use runtime::{ContainerRuntime, DockerRuntime};
pub use worker::{
    WorkerHandle, WorkerOutput, WorkerPlan, WorkerRole, WorkerSpec,
};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use minefleet_config::WorkersConfig;
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::SupervisionError;
use crate::telemetry::{InboundHandler, TelemetryChannel};
use phase::PhaseCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTiming {
    /// Pause between the simulator and the first controller.
    pub settle_delay: Duration,
    /// Per-worker grace before a stop escalates to a kill.
    pub stop_grace: Duration,
}

impl SupervisorTiming {
    pub fn from_config(config: &WorkersConfig) -> Self {
        Self {
            settle_delay: config.settle_delay,
            stop_grace: config.stop_grace,
        }
    }
}

pub struct ProcessSupervisor<R> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    runtime: R,
    plan: WorkerPlan,
    timing: SupervisorTiming,
    phase: PhaseCell,
    /// Set when a failed start left launched workers behind.
    orphaned: AtomicBool,
    tracked: Mutex<Vec<WorkerHandle>>,
    channel: Arc<dyn TelemetryChannel>,
    handler: Arc<dyn InboundHandler>,
}

impl<R> Clone for ProcessSupervisor<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for ProcessSupervisor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("phase", &self.inner.phase.load())
            .field("plan", &self.inner.plan)
            .field("timing", &self.inner.timing)
            .field("orphaned", &self.inner.orphaned.load(Ordering::Acquire))
            .finish()
    }
}

impl<R: ContainerRuntime> ProcessSupervisor<R> {
    pub fn new(
        runtime: R,
        plan: WorkerPlan,
        timing: SupervisorTiming,
        channel: Arc<dyn TelemetryChannel>,
        handler: Arc<dyn InboundHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                plan,
                timing,
                phase: PhaseCell::default(),
                orphaned: AtomicBool::new(false),
                tracked: Mutex::new(Vec::new()),
                channel,
                handler,
            }),
        }
    }

    pub fn phase(&self) -> SupervisionPhase {
        self.inner.phase.load()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == SupervisionPhase::Running
    }

    pub fn runtime(&self) -> &R {
        &self.inner.runtime
    }

    pub fn plan(&self) -> &WorkerPlan {
        &self.inner.plan
    }

    pub async fn tracked_names(&self) -> Vec<String> {
        self.inner
            .tracked
            .lock()
            .await
            .iter()
            .map(|handle| handle.name.clone())
            .collect()
    }

    /// Claim `Stopped -> Starting`. `None` when any other phase is current;
    /// the request is then ignored.
    pub fn begin_start(&self) -> Option<StartTicket> {
        match self
            .inner
            .phase
            .transition(SupervisionPhase::Stopped, SupervisionPhase::Starting)
        {
            Ok(()) => Some(StartTicket::new(self.inner.phase.clone())),
            Err(current) => {
                debug!(phase = %current, "start ignored");
                None
            }
        }
    }

    /// Run the start sequence on a background task.
    pub fn start(
        &self,
        ticket: StartTicket,
    ) -> JoinHandle<Result<(), SupervisionError>> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run_start(ticket).await })
    }

    /// [`begin_start`](Self::begin_start) followed by [`start`](Self::start).
    pub fn request_start(
        &self,
    ) -> Option<JoinHandle<Result<(), SupervisionError>>> {
        self.begin_start().map(|ticket| self.start(ticket))
    }

    /// Tear everything down on a background task.
    ///
    /// Accepted while `Running`, or while `Stopped` if a failed start left
    /// workers behind. `None` means the request was ignored.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let phase = &self.inner.phase;
        let accepted = match phase
            .transition(SupervisionPhase::Running, SupervisionPhase::Stopping)
        {
            Ok(()) => true,
            Err(SupervisionPhase::Stopped)
                if self.inner.orphaned.load(Ordering::Acquire) =>
            {
                phase
                    .transition(
                        SupervisionPhase::Stopped,
                        SupervisionPhase::Stopping,
                    )
                    .is_ok()
            }
            Err(current) => {
                debug!(phase = %current, "stop ignored");
                false
            }
        };
        if !accepted {
            return None;
        }

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move { inner.run_stop().await }))
    }
}

impl<R: ContainerRuntime> Inner<R> {
    async fn run_start(
        &self,
        ticket: StartTicket,
    ) -> Result<(), SupervisionError> {
        if let Err(err) = self.channel.connect(Arc::clone(&self.handler)).await
        {
            error!(error = %err, "telemetry connect failed; start aborted");
            ticket.finish(SupervisionPhase::Stopped);
            return Err(err.into());
        }

        match self.launch_all().await {
            Ok(()) => {
                info!(
                    controllers = self.plan.fleet_size(),
                    visualizers = self.plan.visualizers.len(),
                    "simulation running"
                );
                ticket.finish(SupervisionPhase::Running);
                Ok(())
            }
            Err(err) => {
                let launched = self.tracked.lock().await.len();
                if launched > 0 {
                    self.orphaned.store(true, Ordering::Release);
                    warn!(
                        launched,
                        "start failed after launching workers; stop cleans them up"
                    );
                }
                error!(error = %err, "simulation start failed");
                ticket.finish(SupervisionPhase::Stopped);
                Err(err)
            }
        }
    }

    async fn launch_all(&self) -> Result<(), SupervisionError> {
        self.runtime.remove_stale(&self.plan.names()).await?;

        // Leftovers of a failed start are gone by name; drop their handles.
        let stale = std::mem::take(&mut *self.tracked.lock().await);
        if !stale.is_empty() {
            debug!(workers = stale.len(), "releasing handles of a failed start");
            for mut handle in stale {
                if let Some(child) = handle.child.take() {
                    reap(&handle.name, child, self.timing.stop_grace).await;
                }
            }
        }
        self.orphaned.store(false, Ordering::Release);

        self.launch(&self.plan.simulator).await?;
        if !self.timing.settle_delay.is_zero() {
            debug!(delay = ?self.timing.settle_delay, "waiting for simulator");
            tokio::time::sleep(self.timing.settle_delay).await;
        }

        for controller in &self.plan.controllers {
            self.launch(controller).await?;
        }
        for visualizer in &self.plan.visualizers {
            self.launch(visualizer).await?;
        }
        Ok(())
    }

    async fn launch(
        &self,
        worker: &WorkerSpec,
    ) -> Result<(), SupervisionError> {
        let handle = self.runtime.launch(worker).await?;
        debug!(worker = %worker.name, "worker tracked");
        self.tracked.lock().await.push(handle);
        Ok(())
    }

    async fn run_stop(&self) {
        let handles = std::mem::take(&mut *self.tracked.lock().await);
        info!(workers = handles.len(), "stopping simulation");

        // Visualizers and controllers go before the simulator they talk to.
        for handle in handles.into_iter().rev() {
            self.teardown(handle).await;
        }

        match self.runtime.sweep_orphans().await {
            Ok(0) => {}
            Ok(count) => info!(count, "swept orphaned workers"),
            Err(err) => warn!(error = %err, "orphan sweep failed"),
        }

        self.channel.disconnect().await;
        self.orphaned.store(false, Ordering::Release);
        self.phase.set(SupervisionPhase::Stopped);
    }

    async fn teardown(&self, mut handle: WorkerHandle) {
        let grace = self.timing.stop_grace;
        if let Err(err) = self.runtime.stop(&handle.name, grace).await {
            warn!(worker = %handle.name, error = %err, "stop failed; killing");
            if let Err(err) = self.runtime.kill(&handle.name).await {
                warn!(worker = %handle.name, error = %err, "kill failed");
            }
        }
        if let Some(child) = handle.child.take() {
            reap(&handle.name, child, grace).await;
        }
    }
}

/// Wait for the local client process, killing it after `grace`.
async fn reap(name: &str, mut child: Child, grace: Duration) {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(worker = name, %status, "worker client exited");
        }
        Ok(Err(err)) => {
            warn!(worker = name, error = %err, "failed to wait on worker client");
        }
        Err(_) => {
            if let Err(err) = child.kill().await {
                warn!(worker = name, error = %err, "failed to kill worker client");
            }
        }
    }
}
