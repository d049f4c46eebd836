//! Single-truck cockpit over the framed link.

use std::str::FromStr;
use std::sync::Arc;

use minefleet_model::{DriveMode, FaultKind, TruckCommand};
use tracing::debug;

use crate::error::Result;
use crate::telemetry::framed::FramedChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Accelerate,
    Left,
    Right,
}

impl FromStr for ControlKey {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "accel" | "accelerate" | "up" => Ok(ControlKey::Accelerate),
            "left" => Ok(ControlKey::Left),
            "right" => Ok(ControlKey::Right),
            other => Err(format!("unknown control key `{other}`")),
        }
    }
}

/// Held manual-control keys.
///
/// While anything is held, every [`tick`](Self::tick) yields a control
/// command, not only on change. Letting go of the last key yields one
/// neutral command, then nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualControl {
    accelerate: bool,
    left: bool,
    right: bool,
    release_pending: bool,
}

impl ManualControl {
    pub fn press(&mut self, key: ControlKey) {
        match key {
            ControlKey::Accelerate => self.accelerate = true,
            ControlKey::Left => self.left = true,
            ControlKey::Right => self.right = true,
        }
    }

    pub fn release(&mut self, key: ControlKey) {
        let was_active = self.is_active();
        match key {
            ControlKey::Accelerate => self.accelerate = false,
            ControlKey::Left => self.left = false,
            ControlKey::Right => self.right = false,
        }
        if was_active && !self.is_active() {
            self.release_pending = true;
        }
    }

    pub fn release_all(&mut self) {
        if self.is_active() {
            self.release_pending = true;
        }
        self.accelerate = false;
        self.left = false;
        self.right = false;
    }

    pub fn is_active(&self) -> bool {
        self.accelerate || self.left || self.right
    }

    pub fn tick(&mut self) -> Option<TruckCommand> {
        if self.is_active() {
            self.release_pending = false;
            return Some(TruckCommand::Control {
                accel: i8::from(self.accelerate),
                steer: i8::from(self.right) - i8::from(self.left),
            });
        }
        if std::mem::take(&mut self.release_pending) {
            return Some(TruckCommand::neutral_control());
        }
        None
    }
}

/// Operator action on the cockpit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CockpitAction {
    Mode(DriveMode),
    Fault(FaultKind),
    Reset,
    Hold(ControlKey),
    Release,
}

#[derive(Debug)]
pub struct CockpitSession {
    channel: Arc<FramedChannel>,
    control: ManualControl,
}

impl CockpitSession {
    pub fn new(channel: Arc<FramedChannel>) -> Self {
        Self {
            channel,
            control: ManualControl::default(),
        }
    }

    pub fn control(&self) -> &ManualControl {
        &self.control
    }

    /// One-shot commands go out immediately; held keys go out on ticks.
    pub async fn apply(&mut self, action: CockpitAction) -> Result<()> {
        match action {
            CockpitAction::Mode(mode) => {
                self.send(TruckCommand::Mode { mode }).await
            }
            CockpitAction::Fault(kind) => {
                self.send(TruckCommand::Fault { kind }).await
            }
            CockpitAction::Reset => self.send(TruckCommand::Reset).await,
            CockpitAction::Hold(key) => {
                self.control.press(key);
                Ok(())
            }
            CockpitAction::Release => {
                self.control.release_all();
                Ok(())
            }
        }
    }

    /// Heartbeat; call once per console tick.
    pub async fn tick(&mut self) -> Result<()> {
        match self.control.tick() {
            Some(command) => self.send(command).await,
            None => Ok(()),
        }
    }

    async fn send(&self, command: TruckCommand) -> Result<()> {
        debug!(?command, truck = %self.channel.truck(), "cockpit command");
        self.channel.send_command(&command).await?;
        Ok(())
    }
}
