use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use minefleet_config::WorkersConfig;
use tracing::{debug, info, warn};

use super::spec::{
    CommandSpec, RunMode, kill_spec, list_by_image_spec, remove_spec,
    run_spec, stop_spec, terminal_spec,
};
use super::worker::{WorkerHandle, WorkerOutput, WorkerSpec};
use crate::error::SupervisionError;

/// Launches and tears down named workers.
///
/// Teardown is by name so it works for containers this process did not
/// start, or whose client handle is gone.
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Force-remove leftovers of a previous run. Missing names are fine.
    async fn remove_stale(
        &self,
        names: &[String],
    ) -> Result<(), SupervisionError>;

    async fn launch(
        &self,
        worker: &WorkerSpec,
    ) -> Result<WorkerHandle, SupervisionError>;

    /// Graceful stop, escalating inside the runtime after `grace`.
    async fn stop(
        &self,
        name: &str,
        grace: Duration,
    ) -> Result<(), SupervisionError>;

    async fn kill(&self, name: &str) -> Result<(), SupervisionError>;

    /// Kill anything still running from the worker image. Returns how many
    /// containers were found.
    async fn sweep_orphans(&self) -> Result<usize, SupervisionError>;
}

/// [`ContainerRuntime`] driving the docker (or podman) CLI.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    program: String,
    image: String,
    run_args: Vec<String>,
    terminals: Vec<String>,
}

impl DockerRuntime {
    pub fn from_config(config: &WorkersConfig) -> Self {
        Self {
            program: config.runtime.clone(),
            image: config.image.clone(),
            run_args: config.run_args.clone(),
            terminals: config.terminals.clone(),
        }
    }

    fn run_spec(&self, worker: &WorkerSpec, mode: RunMode) -> CommandSpec {
        run_spec(&self.program, &self.image, &self.run_args, worker, mode)
    }

    async fn output(
        &self,
        spec: &CommandSpec,
    ) -> Result<Output, SupervisionError> {
        let mut cmd = spec.to_command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.output()
            .await
            .map_err(|source| SupervisionError::Runtime {
                command: spec.to_string(),
                source,
            })
    }

    async fn run_checked(
        &self,
        spec: &CommandSpec,
    ) -> Result<String, SupervisionError> {
        let output = self.output(spec).await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_missing_container(&stderr) {
            debug!(command = %spec, "container already gone");
            return Ok(String::new());
        }
        Err(SupervisionError::CommandFailed {
            command: spec.to_string(),
            status: format!("{} ({})", output.status, stderr.trim()),
        })
    }

    async fn launch_terminal(
        &self,
        worker: &WorkerSpec,
    ) -> Result<WorkerHandle, SupervisionError> {
        let inner = self.run_spec(worker, RunMode::Interactive);
        for terminal in &self.terminals {
            let wrapped = terminal_spec(terminal, &inner);
            match wrapped.to_command().spawn() {
                Ok(child) => {
                    debug!(
                        worker = %worker.name,
                        %terminal,
                        "visualizer hosted in terminal"
                    );
                    return Ok(WorkerHandle::new(worker, Some(child)));
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(%terminal, "terminal emulator not installed");
                }
                Err(source) => {
                    return Err(SupervisionError::Spawn {
                        worker: worker.name.clone(),
                        program: terminal.clone(),
                        source,
                    });
                }
            }
        }

        warn!(
            worker = %worker.name,
            "no terminal emulator available; running visualizer detached"
        );
        self.run_checked(&self.run_spec(worker, RunMode::Detached))
            .await?;
        Ok(WorkerHandle::new(worker, None))
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn remove_stale(
        &self,
        names: &[String],
    ) -> Result<(), SupervisionError> {
        if names.is_empty() {
            return Ok(());
        }
        let spec = remove_spec(&self.program, names);
        let output = self.output(&spec).await?;
        // `rm -f` exits non-zero when any name is unknown, which is the
        // normal case after a clean shutdown.
        debug!(
            command = %spec,
            status = %output.status,
            "stale worker cleanup finished"
        );
        Ok(())
    }

    async fn launch(
        &self,
        worker: &WorkerSpec,
    ) -> Result<WorkerHandle, SupervisionError> {
        let mut cmd = match &worker.output {
            WorkerOutput::Terminal => return self.launch_terminal(worker).await,
            WorkerOutput::Discard => {
                self.run_spec(worker, RunMode::Attached).to_command()
            }
            WorkerOutput::LogFile(path) => {
                let (stdout, stderr) = open_log(path).await?;
                let mut cmd =
                    self.run_spec(worker, RunMode::Attached).to_command();
                cmd.stdout(stdout).stderr(stderr);
                cmd
            }
        };

        let child = cmd.spawn().map_err(|source| SupervisionError::Spawn {
            worker: worker.name.clone(),
            program: self.program.clone(),
            source,
        })?;
        info!(worker = %worker.name, pid = ?child.id(), "worker launched");
        Ok(WorkerHandle::new(worker, Some(child)))
    }

    async fn stop(
        &self,
        name: &str,
        grace: Duration,
    ) -> Result<(), SupervisionError> {
        self.run_checked(&stop_spec(&self.program, name, grace))
            .await
            .map(drop)
    }

    async fn kill(&self, name: &str) -> Result<(), SupervisionError> {
        self.run_checked(&kill_spec(&self.program, &[name.to_string()]))
            .await
            .map(drop)
    }

    async fn sweep_orphans(&self) -> Result<usize, SupervisionError> {
        let listed = self
            .run_checked(&list_by_image_spec(&self.program, &self.image))
            .await?;
        let ids: Vec<String> = listed
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        warn!(
            count = ids.len(),
            image = %self.image,
            "killing orphaned workers"
        );
        self.run_checked(&kill_spec(&self.program, &ids)).await?;
        Ok(ids.len())
    }
}

fn is_missing_container(stderr: &str) -> bool {
    let lowered = stderr.to_ascii_lowercase();
    lowered.contains("no such container") || lowered.contains("is not running")
}

async fn open_log(path: &Path) -> Result<(Stdio, Stdio), SupervisionError> {
    let log_error = |source: io::Error| SupervisionError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(log_error)?;
    }
    let file = tokio::fs::File::create(path)
        .await
        .map_err(log_error)?
        .into_std()
        .await;
    let stderr = file.try_clone().map_err(log_error)?;
    Ok((Stdio::from(file), Stdio::from(stderr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_containers_are_not_failures() {
        assert!(is_missing_container(
            "Error response from daemon: No such container: simulator"
        ));
        assert!(is_missing_container(
            "Error response from daemon: Container abc is not running"
        ));
        assert!(!is_missing_container("permission denied"));
    }

    #[tokio::test]
    async fn log_files_are_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("controller-0.log");
        open_log(&path).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn missing_runtime_binary_is_a_spawn_error() {
        let mut config = WorkersConfig::default();
        config.runtime = "minefleet-no-such-runtime".into();
        let runtime = DockerRuntime::from_config(&config);
        let err = runtime
            .remove_stale(&["simulator".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisionError::Runtime { .. }));
    }
}
