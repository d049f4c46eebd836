use dashmap::DashMap;
use minefleet_config::{MapBounds, RouteConfig};
use minefleet_model::{RouteDispatch, TruckId, Waypoint};
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::telemetry::{TelemetryChannel, Topic};

/// Per-truck ordered waypoint lists built from operator clicks.
#[derive(Debug)]
pub struct RoutePlanner {
    routes: DashMap<TruckId, Vec<Waypoint>>,
    cell_size: f64,
    cruise_speed: f64,
    bounds: Option<MapBounds>,
}

impl RoutePlanner {
    pub fn new(cell_size: f64, cruise_speed: f64) -> Self {
        Self {
            routes: DashMap::new(),
            cell_size,
            cruise_speed,
            bounds: None,
        }
    }

    pub fn from_config(config: &RouteConfig) -> Self {
        Self {
            bounds: config.bounds,
            ..Self::new(config.cell_size, config.cruise_speed)
        }
    }

    pub fn with_bounds(mut self, bounds: MapBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Append the grid-snapped point to `truck`'s route.
    ///
    /// Points outside the configured map bounds are refused with `None`.
    pub fn add_waypoint(
        &self,
        truck: TruckId,
        x: f64,
        y: f64,
    ) -> Option<Waypoint> {
        if let Some(bounds) = self.bounds
            && !((0.0..bounds.width).contains(&x)
                && (0.0..bounds.height).contains(&y))
        {
            debug!(%truck, x, y, "waypoint outside map bounds");
            return None;
        }
        let point = Waypoint::snapped(x, y, self.cell_size);
        self.routes.entry(truck).or_default().push(point);
        Some(point)
    }

    pub fn clear(&self, truck: TruckId) {
        self.routes.insert(truck, Vec::new());
    }

    pub fn route(&self, truck: TruckId) -> Vec<Waypoint> {
        self.routes
            .get(&truck)
            .map(|route| route.clone())
            .unwrap_or_default()
    }

    /// Build the dispatch command for `truck` without sending it.
    pub fn dispatch_command(
        &self,
        truck: TruckId,
    ) -> Result<RouteDispatch, DispatchError> {
        let route = self.route(truck);
        if route.is_empty() {
            return Err(DispatchError::EmptyRoute { truck });
        }
        Ok(RouteDispatch::new(truck, &route, self.cruise_speed))
    }

    /// Send `truck`'s route on the route-dispatch topic.
    ///
    /// The route is kept so it can be sent again.
    pub async fn dispatch(
        &self,
        truck: TruckId,
        channel: &dyn TelemetryChannel,
    ) -> Result<RouteDispatch, DispatchError> {
        let command = self.dispatch_command(truck)?;
        if !channel.is_connected() {
            return Err(DispatchError::NotConnected);
        }
        let payload = serde_json::to_vec(&command)
            .map_err(|err| DispatchError::Transport(err.into()))?;
        channel.publish(Topic::RouteDispatch, payload).await?;
        info!(%truck, waypoints = command.route.len(), "route dispatched");
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MockTelemetryChannel;

    fn planner() -> RoutePlanner {
        RoutePlanner::new(10.0, 20.0)
    }

    #[test]
    fn clicks_in_one_cell_store_the_same_point() {
        let planner = planner();
        let first = planner.add_waypoint(TruckId(0), 11.0, 12.0).unwrap();
        let second = planner.add_waypoint(TruckId(0), 19.5, 10.1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Waypoint::new(15.0, 15.0));
        assert_eq!(planner.route(TruckId(0)), vec![first, second]);
        assert!(planner.route(TruckId(1)).is_empty());
    }

    #[test]
    fn bounds_refuse_points_off_the_map() {
        let planner = planner().with_bounds(MapBounds {
            width: 800.0,
            height: 600.0,
        });
        assert!(planner.add_waypoint(TruckId(0), 850.0, 10.0).is_none());
        assert!(planner.add_waypoint(TruckId(0), 10.0, 600.0).is_none());
        assert!(planner.add_waypoint(TruckId(0), -1.0, 10.0).is_none());
        assert!(planner.add_waypoint(TruckId(0), 799.0, 599.0).is_some());
        assert_eq!(planner.route(TruckId(0)).len(), 1);
    }

    #[test]
    fn clear_replaces_route_with_empty() {
        let planner = planner();
        planner.add_waypoint(TruckId(2), 1.0, 1.0);
        planner.clear(TruckId(2));
        assert!(planner.route(TruckId(2)).is_empty());
    }

    #[tokio::test]
    async fn empty_route_never_reaches_the_channel() {
        let mut channel = MockTelemetryChannel::new();
        channel.expect_is_connected().never();
        channel.expect_publish().never();

        let err = planner()
            .dispatch(TruckId(1), &channel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::EmptyRoute { truck } if truck == TruckId(1)
        ));
    }

    #[tokio::test]
    async fn disconnected_channel_is_reported() {
        let planner = planner();
        planner.add_waypoint(TruckId(0), 3.0, 3.0);

        let mut channel = MockTelemetryChannel::new();
        channel.expect_is_connected().return_const(false);
        channel.expect_publish().never();

        let err = planner.dispatch(TruckId(0), &channel).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotConnected));
    }

    #[tokio::test]
    async fn dispatch_publishes_ordered_route_and_keeps_it() {
        let planner = planner();
        planner.add_waypoint(TruckId(1), 3.0, 3.0);
        planner.add_waypoint(TruckId(1), 27.0, 3.0);

        let expected = serde_json::json!({
            "id": 1,
            "route": [
                {"x": 5.0, "y": 5.0, "speed": 20.0},
                {"x": 25.0, "y": 5.0, "speed": 20.0},
            ]
        });

        let mut channel = MockTelemetryChannel::new();
        channel.expect_is_connected().return_const(true);
        channel
            .expect_publish()
            .withf(move |topic, payload| {
                *topic == Topic::RouteDispatch
                    && serde_json::from_slice::<serde_json::Value>(payload)
                        .is_ok_and(|body| body == expected)
            })
            .times(2)
            .returning(|_, _| Ok(()));

        planner.dispatch(TruckId(1), &channel).await.unwrap();
        // Resend is allowed; the route stays planned.
        let sent = planner.dispatch(TruckId(1), &channel).await.unwrap();
        assert_eq!(sent.route.len(), 2);
        assert_eq!(planner.route(TruckId(1)).len(), 2);
    }
}
