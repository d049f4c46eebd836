use std::fmt;
use std::path::PathBuf;

use minefleet_config::WorkersConfig;
use minefleet_model::TruckId;
use tokio::process::Child;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerRole {
    Simulator,
    Controller(TruckId),
    /// Zero-based index into the configured visualizers.
    Visualizer(usize),
}

impl WorkerRole {
    /// Fixed container name; stale containers are removed by this name.
    pub fn name(self) -> String {
        match self {
            WorkerRole::Simulator => "simulator".to_string(),
            WorkerRole::Controller(id) => format!("controller-{id}"),
            WorkerRole::Visualizer(0) => "visualizer".to_string(),
            WorkerRole::Visualizer(index) => format!("visualizer-{}", index + 1),
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Where a worker's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutput {
    Discard,
    LogFile(PathBuf),
    /// Interactive, hosted in a terminal emulator when one is available.
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub role: WorkerRole,
    pub name: String,
    /// Command run inside the worker image.
    pub command: Vec<String>,
    pub output: WorkerOutput,
}

impl WorkerSpec {
    pub fn new(
        role: WorkerRole,
        command: Vec<String>,
        output: WorkerOutput,
    ) -> Self {
        Self {
            role,
            name: role.name(),
            command,
            output,
        }
    }
}

/// Everything one simulation start launches, in launch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPlan {
    pub simulator: WorkerSpec,
    pub controllers: Vec<WorkerSpec>,
    pub visualizers: Vec<WorkerSpec>,
}

impl WorkerPlan {
    pub fn from_config(config: &WorkersConfig, fleet_size: u32) -> Self {
        let simulator = WorkerSpec::new(
            WorkerRole::Simulator,
            config.simulator_command.clone(),
            WorkerOutput::Discard,
        );

        let controllers = TruckId::fleet(fleet_size)
            .map(|id| {
                let role = WorkerRole::Controller(id);
                let mut command = config.controller_command.clone();
                command.push(id.to_string());
                let log = config.log_dir.join(format!("{}.log", role.name()));
                WorkerSpec::new(role, command, WorkerOutput::LogFile(log))
            })
            .collect();

        let visualizers = config
            .visualizers
            .iter()
            .enumerate()
            .map(|(index, command)| {
                WorkerSpec::new(
                    WorkerRole::Visualizer(index),
                    command.clone(),
                    WorkerOutput::Terminal,
                )
            })
            .collect();

        Self {
            simulator,
            controllers,
            visualizers,
        }
    }

    pub fn fleet_size(&self) -> usize {
        self.controllers.len()
    }

    /// Every worker name the plan can produce.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(&self.simulator)
            .chain(&self.controllers)
            .chain(&self.visualizers)
            .map(|spec| spec.name.clone())
            .collect()
    }
}

/// A launched worker as tracked by the supervisor.
///
/// `child` is the local client process (container CLI or terminal), if
/// any. Teardown goes through the container name, not this handle.
#[derive(Debug)]
pub struct WorkerHandle {
    pub role: WorkerRole,
    pub name: String,
    pub child: Option<Child>,
}

impl WorkerHandle {
    pub fn new(spec: &WorkerSpec, child: Option<Child>) -> Self {
        Self {
            role: spec.role,
            name: spec.name.clone(),
            child,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_follows_fleet_size_and_naming() {
        let plan = WorkerPlan::from_config(&WorkersConfig::default(), 3);

        assert_eq!(plan.simulator.command, vec!["./bin/simulador"]);
        assert_eq!(plan.fleet_size(), 3);
        assert_eq!(plan.controllers[2].command, vec!["./bin/app", "2"]);
        assert_eq!(
            plan.controllers[1].output,
            WorkerOutput::LogFile(PathBuf::from("logs/controller-1.log"))
        );
        assert_eq!(
            plan.names(),
            vec![
                "simulator",
                "controller-0",
                "controller-1",
                "controller-2",
                "visualizer",
                "visualizer-2",
            ]
        );
    }
}
