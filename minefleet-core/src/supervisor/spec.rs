//! Container CLI invocations as plain data, so they can be asserted on
//! without spawning anything.

use std::fmt::{self, Display};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::worker::WorkerSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command with stdin closed and output discarded.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

/// How a worker container is attached to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Client stays attached; output flows to the client's stdio.
    Attached,
    /// Allocates a TTY for a terminal-hosted visualizer.
    Interactive,
    /// Client returns immediately; container keeps running.
    Detached,
}

pub fn run_spec(
    runtime: &str,
    image: &str,
    run_args: &[String],
    worker: &WorkerSpec,
    mode: RunMode,
) -> CommandSpec {
    let mut spec = CommandSpec::new(runtime)
        .arg("run")
        .arg("--rm")
        .arg("--name")
        .arg(worker.name.as_str());
    match mode {
        RunMode::Attached => {}
        RunMode::Interactive => spec = spec.arg("-it"),
        RunMode::Detached => spec = spec.arg("-d"),
    }
    spec.args(run_args.iter().cloned())
        .arg(image)
        .args(worker.command.iter().cloned())
}

/// `rm -f` every named container. Missing names are not an error for the
/// runtime beyond a non-zero exit.
pub fn remove_spec(runtime: &str, names: &[String]) -> CommandSpec {
    CommandSpec::new(runtime)
        .arg("rm")
        .arg("-f")
        .args(names.iter().cloned())
}

pub fn stop_spec(runtime: &str, name: &str, grace: Duration) -> CommandSpec {
    // The CLI takes whole seconds; partial seconds round up.
    let secs = grace.as_millis().div_ceil(1000);
    CommandSpec::new(runtime)
        .arg("stop")
        .arg("-t")
        .arg(secs.to_string())
        .arg(name)
}

pub fn kill_spec(runtime: &str, names: &[String]) -> CommandSpec {
    CommandSpec::new(runtime).arg("kill").args(names.iter().cloned())
}

pub fn list_by_image_spec(runtime: &str, image: &str) -> CommandSpec {
    CommandSpec::new(runtime)
        .arg("ps")
        .arg("-q")
        .arg("--filter")
        .arg(format!("ancestor={image}"))
}

/// Wrap `inner` so it runs inside `terminal`.
pub fn terminal_spec(terminal: &str, inner: &CommandSpec) -> CommandSpec {
    let line = inner.to_string();
    let program = terminal
        .rsplit('/')
        .next()
        .unwrap_or(terminal)
        .to_string();
    let spec = CommandSpec::new(terminal);
    match program.as_str() {
        "gnome-terminal" | "kgx" => {
            spec.arg("--").arg("bash").arg("-c").arg(line)
        }
        "konsole" | "xfce4-terminal" | "alacritty" | "kitty" => {
            spec.arg("-e").arg("bash").arg("-c").arg(line)
        }
        _ => spec.arg("-e").arg(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::worker::{WorkerOutput, WorkerRole};
    use minefleet_model::TruckId;

    fn controller() -> WorkerSpec {
        WorkerSpec::new(
            WorkerRole::Controller(TruckId(1)),
            vec!["./bin/app".into(), "1".into()],
            WorkerOutput::Discard,
        )
    }

    fn host_args() -> Vec<String> {
        vec!["--network=host".into(), "--ipc=host".into()]
    }

    #[test]
    fn run_spec_names_container_and_passes_truck_id() {
        let spec = run_spec(
            "docker",
            "atr_cpp",
            &host_args(),
            &controller(),
            RunMode::Attached,
        );
        assert_eq!(spec.program, "docker");
        assert_eq!(
            spec.args,
            vec![
                "run",
                "--rm",
                "--name",
                "controller-1",
                "--network=host",
                "--ipc=host",
                "atr_cpp",
                "./bin/app",
                "1",
            ]
        );
    }

    #[test]
    fn run_modes_add_tty_or_detach() {
        let interactive = run_spec(
            "docker",
            "atr_cpp",
            &[],
            &controller(),
            RunMode::Interactive,
        );
        assert!(interactive.args.contains(&"-it".to_string()));

        let detached =
            run_spec("podman", "atr_cpp", &[], &controller(), RunMode::Detached);
        assert_eq!(detached.program, "podman");
        assert!(detached.args.contains(&"-d".to_string()));
        assert!(!detached.args.contains(&"-it".to_string()));
    }

    #[test]
    fn teardown_specs() {
        let names = vec!["simulator".to_string(), "controller-0".to_string()];
        assert_eq!(
            remove_spec("docker", &names).to_string(),
            "docker rm -f simulator controller-0"
        );
        assert_eq!(
            stop_spec("docker", "simulator", Duration::from_millis(2000))
                .to_string(),
            "docker stop -t 2 simulator"
        );
        assert_eq!(
            stop_spec("docker", "simulator", Duration::from_millis(300))
                .to_string(),
            "docker stop -t 1 simulator"
        );
        assert_eq!(
            stop_spec("docker", "simulator", Duration::from_millis(2500))
                .to_string(),
            "docker stop -t 3 simulator"
        );
        assert_eq!(
            stop_spec("docker", "simulator", Duration::ZERO).to_string(),
            "docker stop -t 0 simulator"
        );
        assert_eq!(
            kill_spec("docker", &["abc123".to_string()]).to_string(),
            "docker kill abc123"
        );
        assert_eq!(
            list_by_image_spec("docker", "atr_cpp").to_string(),
            "docker ps -q --filter ancestor=atr_cpp"
        );
    }

    #[test]
    fn terminal_wrappers() {
        let inner = CommandSpec::new("docker").args(["run", "-it", "img"]);

        let gnome = terminal_spec("gnome-terminal", &inner);
        assert_eq!(
            gnome.args,
            vec!["--", "bash", "-c", "docker run -it img"]
        );

        let xterm = terminal_spec("/usr/bin/xterm", &inner);
        assert_eq!(xterm.program, "/usr/bin/xterm");
        assert_eq!(xterm.args, vec!["-e", "docker run -it img"]);
    }
}
