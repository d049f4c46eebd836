use std::fmt;
use std::sync::Arc;

use minefleet_config::Config;
use minefleet_model::{MapGrid, TruckId, TruckState, Waypoint};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{DispatchError, SupervisionError};
use crate::intake::TelemetryIntake;
use crate::planner::RoutePlanner;
use crate::store::FleetStateStore;
use crate::supervisor::{
    ContainerRuntime, ProcessSupervisor, SupervisionPhase, SupervisorTiming,
    WorkerPlan,
};
use crate::telemetry::{InboundHandler, TelemetryChannel, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Feedback for the operator after a console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl OperatorNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level == NoticeLevel::Warning
    }
}

impl fmt::Display for OperatorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => f.write_str(&self.message),
            NoticeLevel::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Everything the presentation layer draws in one frame.
#[derive(Debug, Clone)]
pub struct ConsoleSnapshot {
    pub trucks: Vec<TruckState>,
    pub map: Option<Arc<MapGrid>>,
    pub selected: TruckId,
    pub route: Vec<Waypoint>,
    pub connected: bool,
    pub phase: SupervisionPhase,
    pub busy: bool,
}

impl ConsoleSnapshot {
    pub fn selected_truck(&self) -> Option<&TruckState> {
        self.trucks.iter().find(|truck| truck.id() == self.selected)
    }
}

/// Composition root for the operator console.
///
/// Operator commands never block on worker launch or teardown; those run
/// on background tasks owned by the supervisor.
pub struct FleetController<R> {
    fleet_size: u32,
    store: Arc<FleetStateStore>,
    intake: Arc<TelemetryIntake>,
    planner: RoutePlanner,
    channel: Arc<dyn TelemetryChannel>,
    supervisor: ProcessSupervisor<R>,
    selected: TruckId,
    starting: Option<JoinHandle<Result<(), SupervisionError>>>,
    stopping: Option<JoinHandle<()>>,
}

impl<R> fmt::Debug for FleetController<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FleetController")
            .field("fleet_size", &self.fleet_size)
            .field("selected", &self.selected)
            .field("trucks", &self.store.len())
            .field("connected", &self.channel.is_connected())
            .field("supervisor", &self.supervisor)
            .finish()
    }
}

impl<R: ContainerRuntime> FleetController<R> {
    pub fn new(
        config: &Config,
        channel: Arc<dyn TelemetryChannel>,
        runtime: R,
    ) -> Self {
        let fleet_size = config.fleet.size;
        let store = Arc::new(FleetStateStore::with_fleet(fleet_size));
        let intake = Arc::new(TelemetryIntake::new(Arc::clone(&store)));
        let handler: Arc<dyn InboundHandler> = intake.clone();
        let supervisor = ProcessSupervisor::new(
            runtime,
            WorkerPlan::from_config(&config.workers, fleet_size),
            SupervisorTiming::from_config(&config.workers),
            Arc::clone(&channel),
            handler,
        );

        Self {
            fleet_size,
            store,
            intake,
            planner: RoutePlanner::from_config(&config.route),
            channel,
            supervisor,
            selected: TruckId(0),
            starting: None,
            stopping: None,
        }
    }

    pub fn store(&self) -> &Arc<FleetStateStore> {
        &self.store
    }

    pub fn planner(&self) -> &RoutePlanner {
        &self.planner
    }

    pub fn supervisor(&self) -> &ProcessSupervisor<R> {
        &self.supervisor
    }

    pub fn selected(&self) -> TruckId {
        self.selected
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn start_simulation(&mut self) -> OperatorNotice {
        let Some(ticket) = self.supervisor.begin_start() else {
            return OperatorNotice::warning(format!(
                "simulation is {}; start ignored",
                self.supervisor.phase()
            ));
        };
        // Clear the previous run before any worker can report.
        self.store.reset_all(self.fleet_size);
        self.starting = Some(self.supervisor.start(ticket));
        info!(fleet_size = self.fleet_size, "simulation start requested");
        OperatorNotice::info(format!(
            "starting simulation with {} trucks",
            self.fleet_size
        ))
    }

    pub fn stop_simulation(&mut self) -> OperatorNotice {
        match self.supervisor.stop() {
            Some(handle) => {
                self.stopping = Some(handle);
                info!("simulation stop requested");
                OperatorNotice::info("stopping simulation")
            }
            None => OperatorNotice::warning(format!(
                "simulation is {}; stop ignored",
                self.supervisor.phase()
            )),
        }
    }

    /// Select `id`, or cycle to the next truck when `id` is `None`.
    pub fn select_truck(&mut self, id: Option<u32>) -> OperatorNotice {
        let next = match id {
            Some(raw) if raw < self.fleet_size => TruckId(raw),
            Some(raw) => {
                return OperatorNotice::warning(format!(
                    "truck {raw} is not in the fleet (0..{})",
                    self.fleet_size
                ));
            }
            None => {
                let fleet = self.fleet_size.max(1);
                TruckId((self.selected.as_u32() + 1) % fleet)
            }
        };
        self.selected = next;
        OperatorNotice::info(format!("truck {next} selected"))
    }

    pub fn add_waypoint(&self, x: f64, y: f64) -> OperatorNotice {
        match self.planner.add_waypoint(self.selected, x, y) {
            Some(point) => OperatorNotice::info(format!(
                "waypoint ({}, {}) added for truck {}",
                point.x, point.y, self.selected
            )),
            None => OperatorNotice::warning(format!(
                "({x}, {y}) is outside the map"
            )),
        }
    }

    pub async fn send_route(&self) -> OperatorNotice {
        let truck = self.selected;
        match self.planner.dispatch(truck, self.channel.as_ref()).await {
            Ok(dispatch) => OperatorNotice::info(format!(
                "route sent to truck {truck} ({} waypoints)",
                dispatch.route.len()
            )),
            Err(DispatchError::EmptyRoute { truck }) => OperatorNotice::warning(
                format!("route for truck {truck} is empty"),
            ),
            Err(DispatchError::NotConnected) => {
                OperatorNotice::warning("not connected")
            }
            Err(DispatchError::Transport(err)) => {
                warn!(%truck, error = %err, "route dispatch failed");
                OperatorNotice::warning(format!(
                    "route dispatch failed: {err}"
                ))
            }
        }
    }

    pub fn clear_route(&self) -> OperatorNotice {
        self.planner.clear(self.selected);
        OperatorNotice::info(format!(
            "route for truck {} cleared",
            self.selected
        ))
    }

    /// Entry point for raw inbound messages; decode errors are swallowed.
    pub fn on_telemetry(&self, topic: Topic, raw: &[u8]) {
        self.intake.on_message(topic, raw);
    }

    pub fn snapshot(&self) -> ConsoleSnapshot {
        let phase = self.supervisor.phase();
        ConsoleSnapshot {
            trucks: self.store.snapshot(),
            map: self.store.map(),
            selected: self.selected,
            route: self.planner.route(self.selected),
            connected: self.channel.is_connected(),
            phase,
            busy: phase.is_busy(),
        }
    }

    /// Wait for in-flight start and stop tasks to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.starting.take()
            && let Err(err) = handle.await
        {
            warn!(error = %err, "start task aborted");
        }
        if let Some(handle) = self.stopping.take()
            && let Err(err) = handle.await
        {
            warn!(error = %err, "stop task aborted");
        }
    }

    /// Settle pending transitions, then stop the simulation if it runs.
    pub async fn shutdown(&mut self) {
        self.settle().await;
        if let Some(handle) = self.supervisor.stop() {
            info!("stopping simulation for shutdown");
            self.stopping = Some(handle);
        }
        self.settle().await;
    }
}
