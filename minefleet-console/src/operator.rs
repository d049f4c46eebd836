//! `minefleet run`: the fixed-tick operator loop.

use std::sync::Arc;

use anyhow::Result;
use minefleet_config::Config;
use minefleet_core::{
    ContainerRuntime, DockerRuntime, FleetController, OperatorNotice,
    RedisChannel, SupervisionPhase, TelemetryChannel, TopicMap,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::intent::{OPERATOR_HELP, OperatorIntent, spawn_stdin_lines};
use crate::render;

enum Flow {
    Continue,
    Quit,
}

pub async fn run(config: Config) -> Result<()> {
    let topics = TopicMap::new(config.broker.topics.clone());
    let channel: Arc<dyn TelemetryChannel> =
        Arc::new(RedisChannel::new(config.broker.url.clone(), topics));
    let runtime = DockerRuntime::from_config(&config.workers);
    let mut console = FleetController::new(&config, channel, runtime);

    info!(
        fleet_size = config.fleet.size,
        broker = %config.broker.url,
        tick_hz = config.console.tick_hz,
        "operator console ready"
    );
    println!("{OPERATOR_HELP}");

    let mut lines = spawn_stdin_lines();
    let mut ticker = tokio::time::interval(config.console.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_seen: Option<(SupervisionPhase, bool)> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Flow::Quit = drain(&mut console, &mut lines).await {
                    break;
                }
                let snapshot = console.snapshot();
                let seen = (snapshot.phase, snapshot.connected);
                if last_seen != Some(seen) {
                    println!("{}", render::header(&snapshot));
                    last_seen = Some(seen);
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupt received");
                break;
            }
        }
    }

    println!("shutting down");
    console.shutdown().await;
    Ok(())
}

/// Apply every intent queued since the last tick.
async fn drain<R: ContainerRuntime>(
    console: &mut FleetController<R>,
    lines: &mut tokio::sync::mpsc::Receiver<String>,
) -> Flow {
    loop {
        let line = match lines.try_recv() {
            Ok(line) => line,
            Err(TryRecvError::Empty) => return Flow::Continue,
            Err(TryRecvError::Disconnected) => {
                debug!("operator input closed");
                return Flow::Quit;
            }
        };
        match line.parse::<OperatorIntent>() {
            Ok(intent) => {
                if let Flow::Quit = apply(console, intent).await {
                    return Flow::Quit;
                }
            }
            Err(err) => println!("{err}"),
        }
    }
}

async fn apply<R: ContainerRuntime>(
    console: &mut FleetController<R>,
    intent: OperatorIntent,
) -> Flow {
    let notice = match intent {
        OperatorIntent::Start => console.start_simulation(),
        OperatorIntent::Stop => console.stop_simulation(),
        OperatorIntent::Select(id) => console.select_truck(id),
        OperatorIntent::Waypoint { x, y } => console.add_waypoint(x, y),
        OperatorIntent::Send => console.send_route().await,
        OperatorIntent::Clear => console.clear_route(),
        OperatorIntent::Status => {
            println!("{}", render::status(&console.snapshot()));
            return Flow::Continue;
        }
        OperatorIntent::Help => {
            println!("{OPERATOR_HELP}");
            return Flow::Continue;
        }
        OperatorIntent::Quit => return Flow::Quit,
    };
    report(&notice);
    Flow::Continue
}

fn report(notice: &OperatorNotice) {
    println!("{notice}");
}
