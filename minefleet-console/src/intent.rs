//! Operator input lines parsed into console intents.

use std::str::FromStr;

use minefleet_core::{CockpitAction, ControlKey};
use minefleet_model::{DriveMode, FaultKind};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },
    #[error("{0}")]
    Argument(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorIntent {
    Start,
    Stop,
    /// `None` cycles to the next truck.
    Select(Option<u32>),
    Waypoint { x: f64, y: f64 },
    Send,
    Clear,
    Status,
    Help,
    Quit,
}

pub const OPERATOR_HELP: &str = "\
commands:
  start            launch the simulator, controllers and visualizers
  stop             tear every worker down
  select [id]      select a truck, or cycle to the next one
  wp <x> <y>       add a waypoint for the selected truck
  send             dispatch the selected truck's route
  clear            forget the selected truck's route
  status           print the fleet
  quit             stop the simulation and exit";

impl FromStr for OperatorIntent {
    type Err = IntentError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(IntentError::Empty)?;
        let args: Vec<&str> = words.collect();
        let intent = match (command.to_ascii_lowercase().as_str(), args.as_slice())
        {
            ("start", []) => OperatorIntent::Start,
            ("stop", []) => OperatorIntent::Stop,
            ("select", []) => OperatorIntent::Select(None),
            ("select", [id]) => {
                OperatorIntent::Select(Some(id.parse().map_err(|_| {
                    IntentError::Argument(format!("`{id}` is not a truck id"))
                })?))
            }
            ("select", _) => {
                return Err(IntentError::Usage {
                    command: "select",
                    expected: "an optional truck id",
                });
            }
            ("wp" | "waypoint", [x, y]) => OperatorIntent::Waypoint {
                x: coordinate(x)?,
                y: coordinate(y)?,
            },
            ("wp" | "waypoint", _) => {
                return Err(IntentError::Usage {
                    command: "wp",
                    expected: "two coordinates",
                });
            }
            ("send", []) => OperatorIntent::Send,
            ("clear", []) => OperatorIntent::Clear,
            ("status", []) => OperatorIntent::Status,
            ("help" | "?", _) => OperatorIntent::Help,
            ("quit" | "exit", _) => OperatorIntent::Quit,
            (other, _) => return Err(IntentError::Unknown(other.to_string())),
        };
        Ok(intent)
    }
}

fn coordinate(raw: &str) -> Result<f64, IntentError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            IntentError::Argument(format!("`{raw}` is not a coordinate"))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CockpitIntent {
    Action(CockpitAction),
    Status,
    Help,
    Quit,
}

pub const COCKPIT_HELP: &str = "\
commands:
  auto | manual               switch the driving mode
  fault <electric|hydraulic>  inject a fault
  reset                       clear faults
  hold <accel|left|right>     hold a control key (repeats every tick)
  release                     release every held key
  status                      print the truck
  quit                        close the link and exit";

impl FromStr for CockpitIntent {
    type Err = IntentError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(IntentError::Empty)?;
        let args: Vec<&str> = words.collect();
        let action = match (command.to_ascii_lowercase().as_str(), args.as_slice())
        {
            ("auto", []) => CockpitAction::Mode(DriveMode::Auto),
            ("manual", []) => CockpitAction::Mode(DriveMode::Manual),
            ("fault", [kind]) => CockpitAction::Fault(
                kind.parse::<FaultKind>().map_err(IntentError::Argument)?,
            ),
            ("fault", _) => {
                return Err(IntentError::Usage {
                    command: "fault",
                    expected: "a fault kind",
                });
            }
            ("reset", []) => CockpitAction::Reset,
            ("hold", [key]) => CockpitAction::Hold(
                key.parse::<ControlKey>().map_err(IntentError::Argument)?,
            ),
            ("hold", _) => {
                return Err(IntentError::Usage {
                    command: "hold",
                    expected: "one of accel, left, right",
                });
            }
            ("release", []) => CockpitAction::Release,
            ("status", []) => return Ok(CockpitIntent::Status),
            ("help" | "?", _) => return Ok(CockpitIntent::Help),
            ("quit" | "exit", _) => return Ok(CockpitIntent::Quit),
            (other, _) => return Err(IntentError::Unknown(other.to_string())),
        };
        Ok(CockpitIntent::Action(action))
    }
}

/// Forward stdin lines to the tick loop. The channel closes on EOF.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read operator input");
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_commands_parse() {
        assert_eq!("start".parse(), Ok(OperatorIntent::Start));
        assert_eq!("  STOP ".parse(), Ok(OperatorIntent::Stop));
        assert_eq!("select".parse(), Ok(OperatorIntent::Select(None)));
        assert_eq!("select 2".parse(), Ok(OperatorIntent::Select(Some(2))));
        assert_eq!(
            "wp 12.5 40".parse(),
            Ok(OperatorIntent::Waypoint { x: 12.5, y: 40.0 })
        );
        assert_eq!("exit".parse(), Ok(OperatorIntent::Quit));
    }

    #[test]
    fn operator_usage_errors() {
        assert_eq!("".parse::<OperatorIntent>(), Err(IntentError::Empty));
        assert!(matches!(
            "wp 1".parse::<OperatorIntent>(),
            Err(IntentError::Usage { command: "wp", .. })
        ));
        assert!(matches!(
            "wp 1 NaN".parse::<OperatorIntent>(),
            Err(IntentError::Argument(_))
        ));
        assert!(matches!(
            "select -1".parse::<OperatorIntent>(),
            Err(IntentError::Argument(_))
        ));
        assert_eq!(
            "launch".parse::<OperatorIntent>(),
            Err(IntentError::Unknown("launch".into()))
        );
    }

    #[test]
    fn cockpit_commands_parse() {
        assert_eq!(
            "manual".parse(),
            Ok(CockpitIntent::Action(CockpitAction::Mode(DriveMode::Manual)))
        );
        assert_eq!(
            "fault Hydraulic".parse(),
            Ok(CockpitIntent::Action(CockpitAction::Fault(
                FaultKind::Hydraulic
            )))
        );
        assert_eq!(
            "hold up".parse(),
            Ok(CockpitIntent::Action(CockpitAction::Hold(
                ControlKey::Accelerate
            )))
        );
        assert_eq!(
            "release".parse(),
            Ok(CockpitIntent::Action(CockpitAction::Release))
        );
        assert_eq!("quit".parse(), Ok(CockpitIntent::Quit));
    }

    #[test]
    fn cockpit_rejects_unknown_arguments() {
        assert!(matches!(
            "fault thermal".parse::<CockpitIntent>(),
            Err(IntentError::Argument(_))
        ));
        assert!(matches!(
            "hold".parse::<CockpitIntent>(),
            Err(IntentError::Usage { command: "hold", .. })
        ));
        assert!(matches!(
            "reset now".parse::<CockpitIntent>(),
            Err(IntentError::Unknown(_))
        ));
    }
}
