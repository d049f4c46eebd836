mod support;

use std::sync::Arc;
use std::time::Duration;

use minefleet_config::Config;
use minefleet_core::{
    FleetController, NoticeLevel, SupervisionPhase, Topic,
};
use minefleet_model::{TelemetryUpdate, TruckId};
use serde_json::{Value, json};
use support::{RecordingChannel, RecordingRuntime};

fn controller(
    channel: Arc<RecordingChannel>,
) -> (FleetController<RecordingRuntime>, RecordingRuntime) {
    let mut config = Config::default();
    config.workers.settle_delay = Duration::ZERO;
    config.workers.stop_grace = Duration::from_millis(10);
    let runtime = RecordingRuntime::new();
    (
        FleetController::new(&config, channel, runtime.clone()),
        runtime,
    )
}

#[tokio::test]
async fn selection_cycles_through_the_fleet() {
    let (mut console, _) = controller(RecordingChannel::new());
    assert_eq!(console.selected(), TruckId(0));

    let seen: Vec<u32> = (0..4)
        .map(|_| {
            console.select_truck(None);
            console.selected().as_u32()
        })
        .collect();
    assert_eq!(seen, vec![1, 2, 0, 1]);

    let notice = console.select_truck(Some(7));
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(console.selected(), TruckId(1));

    assert!(!console.select_truck(Some(2)).is_warning());
    assert_eq!(console.selected(), TruckId(2));
}

#[tokio::test]
async fn start_resets_the_fleet_before_workers_report() {
    let (mut console, runtime) = controller(RecordingChannel::new());
    console.on_telemetry(
        Topic::SensorTelemetry,
        br#"{"id":1,"x":40,"y":12,"fault":true}"#,
    );
    console.on_telemetry(Topic::SensorTelemetry, br#"{"id":9,"x":1}"#);
    assert_eq!(console.store().len(), 4);

    let notice = console.start_simulation();
    assert!(!notice.is_warning());
    let trucks = console.snapshot().trucks;
    assert_eq!(trucks.len(), 3);
    assert!(trucks.iter().all(|truck| truck.is_default()));

    console.settle().await;
    assert_eq!(console.supervisor().phase(), SupervisionPhase::Running);
    assert!(!runtime.events().await.is_empty());
}

#[tokio::test]
async fn repeated_start_is_reported_not_queued() {
    let (mut console, runtime) = controller(RecordingChannel::new());
    assert!(!console.start_simulation().is_warning());
    let second = console.start_simulation();
    assert!(second.is_warning());
    assert!(second.message.contains("starting"));

    console.settle().await;
    let launches = runtime
        .events()
        .await
        .iter()
        .filter(|event| event.as_str() == "launch:simulator")
        .count();
    assert_eq!(launches, 1);
}

#[tokio::test]
async fn route_dispatch_needs_waypoints_and_a_link() {
    let channel = RecordingChannel::new();
    let (mut console, _) = controller(Arc::clone(&channel));
    console.select_truck(Some(1));

    let notice = console.send_route().await;
    assert_eq!(notice.message, "route for truck 1 is empty");

    assert!(!console.add_waypoint(13.0, 8.0).is_warning());
    assert!(!console.add_waypoint(27.0, 8.0).is_warning());
    let notice = console.send_route().await;
    assert_eq!(notice.message, "not connected");

    console.start_simulation();
    console.settle().await;
    assert!(console.is_connected());

    let notice = console.send_route().await;
    assert_eq!(notice.message, "route sent to truck 1 (2 waypoints)");

    let published = channel.published().await;
    assert_eq!(published.len(), 1);
    let (topic, payload) = &published[0];
    assert_eq!(*topic, Topic::RouteDispatch);
    let body: Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(
        body,
        json!({
            "id": 1,
            "route": [
                {"x": 15.0, "y": 5.0, "speed": 20.0},
                {"x": 25.0, "y": 5.0, "speed": 20.0}
            ]
        })
    );

    // The route stays planned after dispatch.
    assert_eq!(console.snapshot().route.len(), 2);
    console.clear_route();
    assert!(console.snapshot().route.is_empty());
}

#[tokio::test]
async fn inbound_messages_reach_the_snapshot() {
    let channel = RecordingChannel::new();
    let (mut console, _) = controller(Arc::clone(&channel));
    console.start_simulation();
    console.settle().await;

    let update = TelemetryUpdate::new(TruckId(0))
        .with_position(10.0, 20.0)
        .with_fault(true);
    channel.deliver(
        Topic::SensorTelemetry,
        &serde_json::to_vec(&update).unwrap(),
    );
    channel.deliver(Topic::SensorTelemetry, br#"{"id":0,"x":11.0}"#);
    channel.deliver(Topic::MapData, br#"{"map":["0A","B1"]}"#);
    channel.deliver(Topic::SystemStatus, b"not json");

    let snapshot = console.snapshot();
    let truck = snapshot.selected_truck().unwrap();
    assert_eq!((truck.x, truck.y), (11.0, 20.0));
    assert!(truck.fault);
    assert_eq!(snapshot.map.unwrap().to_lines(), vec!["0A", "B1"]);
    assert!(snapshot.connected);
    assert_eq!(snapshot.phase, SupervisionPhase::Running);
    assert!(!snapshot.busy);
}

#[tokio::test]
async fn shutdown_stops_a_running_simulation() {
    let channel = RecordingChannel::new();
    let (mut console, runtime) = controller(Arc::clone(&channel));

    assert!(console.stop_simulation().is_warning());

    console.start_simulation();
    console.shutdown().await;

    let snapshot = console.snapshot();
    assert_eq!(snapshot.phase, SupervisionPhase::Stopped);
    assert!(!snapshot.connected);
    assert_eq!(channel.disconnects(), 1);
    assert!(runtime.events().await.contains(&"sweep".to_string()));
    assert!(console.supervisor().tracked_names().await.is_empty());
}
