//! `minefleet cockpit`: drive one truck over the framed link.

use std::sync::Arc;

use anyhow::{Context, Result};
use minefleet_config::Config;
use minefleet_core::{
    CockpitSession, FleetStateStore, FramedChannel, TelemetryChannel,
    TelemetryIntake,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::intent::{COCKPIT_HELP, CockpitIntent, spawn_stdin_lines};
use crate::render;

pub async fn run(config: Config) -> Result<()> {
    let channel = Arc::new(FramedChannel::new(&config.framed));
    let store = Arc::new(FleetStateStore::new());
    let intake = Arc::new(TelemetryIntake::new(Arc::clone(&store)));

    channel.connect(intake).await.with_context(|| {
        format!("failed to open framed link to {}", config.framed.addr)
    })?;
    info!(
        addr = %config.framed.addr,
        truck = config.framed.truck_id,
        "cockpit connected"
    );
    println!("{COCKPIT_HELP}");

    let mut session = CockpitSession::new(Arc::clone(&channel));
    let mut lines = spawn_stdin_lines();
    let mut ticker = tokio::time::interval(config.console.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'ticks: loop {
        tokio::select! {
            _ = ticker.tick() => {
                loop {
                    let line = match lines.try_recv() {
                        Ok(line) => line,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break 'ticks,
                    };
                    match line.parse::<CockpitIntent>() {
                        Ok(CockpitIntent::Action(action)) => {
                            if let Err(err) = session.apply(action).await {
                                warn!(error = %err, "cockpit command failed");
                            }
                        }
                        Ok(CockpitIntent::Status) => {
                            for truck in store.snapshot() {
                                println!("{}", render::truck_line(&truck, true));
                            }
                        }
                        Ok(CockpitIntent::Help) => println!("{COCKPIT_HELP}"),
                        Ok(CockpitIntent::Quit) => break 'ticks,
                        Err(err) => println!("{err}"),
                    }
                }
                if let Err(err) = session.tick().await {
                    warn!(error = %err, "control heartbeat failed");
                }
                if !channel.is_connected() {
                    // No automatic reconnect; the operator restarts the cockpit.
                    println!("link to {} lost", config.framed.addr);
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupt received");
                break;
            }
        }
    }

    channel.disconnect().await;
    Ok(())
}
