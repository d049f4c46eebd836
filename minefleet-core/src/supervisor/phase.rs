use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{debug, info};

/// Lifecycle of the supervised worker set.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`. The two
/// transitional phases are "busy" and reject every start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SupervisionPhase {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl SupervisionPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SupervisionPhase::Starting,
            2 => SupervisionPhase::Running,
            3 => SupervisionPhase::Stopping,
            _ => SupervisionPhase::Stopped,
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(
            self,
            SupervisionPhase::Starting | SupervisionPhase::Stopping
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SupervisionPhase::Stopped => "stopped",
            SupervisionPhase::Starting => "starting",
            SupervisionPhase::Running => "running",
            SupervisionPhase::Stopping => "stopping",
        }
    }
}

impl fmt::Display for SupervisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared atomic phase. Every transition is a single compare-exchange.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    pub(crate) fn load(&self) -> SupervisionPhase {
        SupervisionPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn transition(
        &self,
        from: SupervisionPhase,
        to: SupervisionPhase,
    ) -> Result<(), SupervisionPhase> {
        self.0
            .compare_exchange(
                from as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| info!(%from, %to, "supervision transition"))
            .map_err(SupervisionPhase::from_u8)
    }

    pub(crate) fn set(&self, phase: SupervisionPhase) {
        let previous = SupervisionPhase::from_u8(
            self.0.swap(phase as u8, Ordering::AcqRel),
        );
        if previous != phase {
            info!(from = %previous, to = %phase, "supervision transition");
        }
    }
}

/// Proof that the supervisor moved `Stopped -> Starting`.
///
/// Hand it to [`ProcessSupervisor::start`](super::ProcessSupervisor::start)
/// to launch. Dropping it unused puts the supervisor back to `Stopped`.
#[must_use = "dropping a StartTicket cancels the start"]
#[derive(Debug)]
pub struct StartTicket {
    phase: PhaseCell,
    armed: bool,
}

impl StartTicket {
    pub(crate) fn new(phase: PhaseCell) -> Self {
        Self { phase, armed: true }
    }

    /// Settle the start with its final phase.
    pub(crate) fn finish(mut self, outcome: SupervisionPhase) {
        self.armed = false;
        self.phase.set(outcome);
    }
}

impl Drop for StartTicket {
    fn drop(&mut self) {
        if self.armed {
            debug!("start ticket dropped unused; reverting to stopped");
            self.phase.set(SupervisionPhase::Stopped);
        }
    }
}
