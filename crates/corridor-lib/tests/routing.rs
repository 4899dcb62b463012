mod common;

use common::{at, bundle, campus, edge, node, resolve, settings, unit_velocities};
use corridor_lib::matrix::build_matrices_at;
use corridor_lib::{
    find_route, select_strategy, AccessMode, GraphSnapshot, Point, Room, RoomAttachment, Route,
    RouteError, RouteStrategy, RoutingPlan, StoreSettings,
};

fn route(graph: &GraphSnapshot, access: AccessMode, from: &str, to: &str) -> Result<Route, RouteError> {
    let bundle = bundle(graph, access);
    let start = resolve(graph, access, from);
    let target = resolve(graph, access, to);
    find_route(graph, &bundle, &start, &target)
}

fn points(coords: &[(f64, f64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[test]
fn node_to_node_route_on_one_floor() {
    let graph = campus();
    let route = route(&graph, AccessMode::standard(), "1", "3").unwrap();

    assert_eq!(route.strategy, RouteStrategy::Graph);
    assert_eq!(route.node_path, vec![1, 2, 3]);
    assert_eq!(route.time_seconds, 14.2);
    assert_eq!(route.distance_metres, 20.0);
    assert_eq!(
        route.polylines.ground.points,
        points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)])
    );
    assert!(route.polylines.first.is_empty());
}

#[test]
fn room_on_node_to_room_on_edge_across_floors() {
    let graph = campus();
    let route = route(&graph, AccessMode::standard(), "Reception", "Chemistry Lab").unwrap();

    assert_eq!(route.node_path, vec![1, 2, 3, 6]);
    assert_eq!(route.time_seconds, 29.2);
    assert_eq!(route.distance_metres, 33.0);
    assert_eq!(route.start.resolved_node, Some(1));
    assert_eq!(route.target.resolved_node, Some(6));

    let ground = &route.polylines.ground;
    assert_eq!(
        ground.points,
        points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 0.0)])
    );
    assert_eq!(ground.breaks, vec![3]);
    assert!(!ground.draws_segment_after(3));

    let first = &route.polylines.first;
    assert_eq!(
        first.points,
        points(&[(20.0, 0.0), (20.0, 0.0), (25.0, 0.0), (25.0, 2.0)])
    );
    assert!(first.breaks.is_empty());
}

#[test]
fn two_candidate_ends_pick_the_cheapest_pair() {
    let graph = campus();
    let access = AccessMode::standard();
    let start = resolve(&graph, access, "Art Studio");
    let target = resolve(&graph, access, "Chemistry Lab");

    let plan = RoutingPlan::for_locations(&graph, &start, &target).unwrap();
    assert_eq!(plan.start_candidates, vec![1, 2]);
    assert_eq!(plan.target_candidates, vec![6, 8]);

    let route = find_route(&graph, &bundle(&graph, access), &start, &target).unwrap();
    assert_eq!(route.start.resolved_node, Some(2));
    assert_eq!(route.target.resolved_node, Some(6));
    assert_eq!(route.node_path, vec![2, 3, 6]);
    assert_eq!(route.time_seconds, 26.4);
    assert_eq!(route.distance_metres, 29.0);
    assert_eq!(
        route.polylines.ground.points,
        points(&[(4.0, -2.0), (4.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 0.0)])
    );
    assert_eq!(route.polylines.ground.breaks, vec![4]);
}

/// Triangle 1-2-3 of 10 m corridors with room "M" midway along 1-2, so both
/// ends of its edge are equally far from node 3. Room "N" faces "M" across
/// the corridor and meets it at the same point.
fn symmetric_graph() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![node(1, 0.0, 0.0), node(2, 10.0, 0.0), node(3, 5.0, 8.66)],
        vec![
            edge(1, 1, 2, 10.0, false),
            edge(2, 1, 3, 10.0, false),
            edge(3, 2, 3, 10.0, false),
        ],
        vec![
            Room {
                id: "M".to_string(),
                name: Some("Midway".to_string()),
                attachment: RoomAttachment::Edge {
                    edge: 1,
                    door: Point::new(5.0, -2.0),
                    connector_angle: 90.0,
                },
            },
            Room {
                id: "N".to_string(),
                name: Some("Opposite".to_string()),
                attachment: RoomAttachment::Edge {
                    edge: 1,
                    door: Point::new(5.0, 2.0),
                    connector_angle: 270.0,
                },
            },
        ],
        unit_velocities(),
        StoreSettings::default(),
    )
}

#[test]
fn equal_cost_start_candidates_keep_the_first_listed() {
    let graph = symmetric_graph();
    let access = AccessMode::standard();
    let start = resolve(&graph, access, "M");
    let target = resolve(&graph, access, "3");

    let plan = RoutingPlan::for_locations(&graph, &start, &target).unwrap();
    assert_eq!(plan.start_candidates, vec![1, 2]);

    let route = find_route(&graph, &bundle(&graph, access), &start, &target).unwrap();
    assert_eq!(route.start.resolved_node, Some(plan.start_candidates[0]));
    assert_eq!(route.node_path, vec![1, 3]);
    assert_eq!(route.time_seconds, 15.0);
    assert_eq!(route.distance_metres, 15.0);
}

#[test]
fn equal_cost_target_candidates_keep_the_first_listed() {
    let graph = symmetric_graph();
    let access = AccessMode::standard();
    let start = resolve(&graph, access, "3");
    let target = resolve(&graph, access, "M");

    let plan = RoutingPlan::for_locations(&graph, &start, &target).unwrap();
    assert_eq!(plan.target_candidates, vec![1, 2]);

    let route = find_route(&graph, &bundle(&graph, access), &start, &target).unwrap();
    assert_eq!(route.target.resolved_node, Some(plan.target_candidates[0]));
    assert_eq!(route.node_path, vec![3, 1]);
    assert_eq!(route.time_seconds, 15.0);
}

#[test]
fn facing_rooms_on_one_edge_are_zero_distance_apart() {
    let graph = symmetric_graph();
    let route = route(&graph, AccessMode::standard(), "M", "N").unwrap();

    assert_eq!(route.strategy, RouteStrategy::Direct);
    assert_eq!(route.distance_metres, 0.0);
    assert_eq!(route.time_seconds, 0.0);
    assert_eq!(
        route.polylines.ground.points,
        points(&[(5.0, -2.0), (5.0, 0.0), (5.0, 0.0), (5.0, 2.0)])
    );
}

#[test]
fn directed_edge_rooms_use_a_single_entry_node() {
    let graph = campus();
    let access = AccessMode::standard();
    let physics = resolve(&graph, access, "Physics Lab");
    let chemistry = resolve(&graph, access, "Chemistry Lab");

    let plan = RoutingPlan::for_locations(&graph, &physics, &chemistry).unwrap();
    assert_eq!(plan.start_candidates, vec![8]);
    let plan = RoutingPlan::for_locations(&graph, &chemistry, &physics).unwrap();
    assert_eq!(plan.target_candidates, vec![7]);
}

#[test]
fn rooms_on_the_same_edge_travel_directly() {
    let graph = campus();
    let route = route(&graph, AccessMode::standard(), "Art Studio", "Music Room").unwrap();

    assert_eq!(route.strategy, RouteStrategy::Direct);
    assert!(route.node_path.is_empty());
    assert_eq!(route.distance_metres, 3.0);
    assert_eq!(route.time_seconds, 2.1);
    assert_eq!(
        route.polylines.ground.points,
        points(&[(4.0, -2.0), (4.0, 0.0), (7.0, 0.0), (7.0, 2.0)])
    );

    let back = self::route(&graph, AccessMode::standard(), "Music Room", "Art Studio").unwrap();
    assert_eq!(back.distance_metres, 3.0);
}

#[test]
fn directed_shared_edge_is_direct_only_downstream() {
    let graph = campus();
    let access = AccessMode::standard();

    let downstream = route(&graph, access, "Optics Lab", "Physics Lab").unwrap();
    assert_eq!(downstream.strategy, RouteStrategy::Direct);
    assert_eq!(downstream.distance_metres, 2.8);
    assert_eq!(downstream.time_seconds, 2.0);

    let physics = resolve(&graph, access, "Physics Lab");
    let optics = resolve(&graph, access, "Optics Lab");
    assert_eq!(
        select_strategy(&graph, &physics, &optics).unwrap(),
        RouteStrategy::Graph
    );
    // Upstream on a one-way corridor with the lift excluded.
    assert!(matches!(
        find_route(&graph, &bundle(&graph, access), &physics, &optics),
        Err(RouteError::TargetUnreachable { ref location }) if location == "Optics Lab"
    ));

    let step_free = route(&graph, AccessMode::step_free(), "Physics Lab", "Optics Lab").unwrap();
    assert_eq!(step_free.strategy, RouteStrategy::Direct);
    assert_eq!(step_free.distance_metres, 2.8);
}

#[test]
fn one_way_corridor_is_followed_unless_disabled() {
    let graph = campus();

    let forward = route(&graph, AccessMode::standard(), "Library", "Lift Lobby Ground").unwrap();
    assert_eq!(forward.node_path, vec![5, 4]);
    assert_eq!(forward.time_seconds, 15.4);
    assert_eq!(forward.distance_metres, 20.0);
    assert_eq!(
        forward.polylines.ground.points,
        points(&[(0.0, 12.0), (0.0, 10.0), (20.0, 10.0)])
    );

    let back = route(&graph, AccessMode::standard(), "Lift Lobby Ground", "Library").unwrap();
    assert_eq!(back.node_path, vec![4, 3, 2, 1, 5]);
    assert_eq!(back.time_seconds, 28.4);
    assert_eq!(back.distance_metres, 40.0);
    assert_eq!(
        back.polylines.ground.points,
        points(&[
            (20.0, 10.0),
            (22.0, 7.0),
            (22.0, 3.0),
            (20.0, 0.0),
            (10.0, 0.0),
            (0.0, 0.0),
            (0.0, 10.0),
            (0.0, 12.0),
        ])
    );

    let relaxed = route(&graph, AccessMode::new(false, false), "Lift Lobby Ground", "Library").unwrap();
    assert_eq!(relaxed.node_path, vec![4, 5]);
}

#[test]
fn step_free_route_takes_the_lift() {
    let graph = campus();
    let route = route(&graph, AccessMode::step_free(), "Main Entrance", "Science Corridor").unwrap();

    assert_eq!(route.node_path, vec![1, 2, 3, 4, 7, 8]);
    assert_eq!(route.time_seconds, 39.3);
    assert_eq!(route.distance_metres, 44.0);
    assert_eq!(
        route.polylines.ground.points,
        points(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (20.0, 0.0),
            (22.0, 3.0),
            (22.0, 7.0),
            (20.0, 10.0),
            (20.0, 10.0),
        ])
    );
    assert_eq!(route.polylines.ground.breaks, vec![6]);
    assert_eq!(
        route.polylines.first.points,
        points(&[(20.0, 10.0), (20.0, 10.0), (30.0, 0.0)])
    );
}

#[test]
fn gate_nodes_are_closed_unless_an_endpoint_is_at_the_boundary() {
    let graph = campus();
    let access = AccessMode::standard();

    let to_car_park = route(&graph, access, "1", "Car Park").unwrap();
    assert_eq!(to_car_park.node_path, vec![1, 9, 10]);
    assert_eq!(to_car_park.time_seconds, 21.4);
    assert_eq!(to_car_park.distance_metres, 30.0);

    assert!(matches!(
        route(&graph, access, "Reception", "Bike Shed"),
        Err(RouteError::TargetUnreachable { .. })
    ));
    assert!(matches!(
        route(&graph, access, "Bike Shed", "Reception"),
        Err(RouteError::StartUnreachable { ref location }) if location == "Bike Shed"
    ));
}

#[test]
fn same_start_and_target_is_a_stationary_route() {
    let graph = campus();
    let route = route(&graph, AccessMode::standard(), "G1", "g1").unwrap();

    assert_eq!(route.strategy, RouteStrategy::Stationary);
    assert_eq!(route.time_seconds, 0.0);
    assert_eq!(route.distance_metres, 0.0);
    assert!(route.node_path.is_empty());
    assert!(matches!(
        route.require_movement(),
        Err(RouteError::SameStartAndTarget)
    ));
}

#[test]
fn congestion_slows_the_route() {
    let graph = campus();
    let access = AccessMode::standard();
    let bundle = build_matrices_at(&graph, &settings(access, true), at(10, 31)).unwrap();
    let start = resolve(&graph, access, "1");
    let target = resolve(&graph, access, "3");

    let route = find_route(&graph, &bundle, &start, &target).unwrap();
    assert_eq!(route.time_seconds, 25.0);
    assert_eq!(route.distance_metres, 20.0);
}

#[test]
fn route_serialises_to_json() {
    let graph = campus();
    let route = route(&graph, AccessMode::standard(), "Reception", "Chemistry Lab").unwrap();
    let json = serde_json::to_value(&route).unwrap();

    assert_eq!(json["strategy"], "graph");
    assert_eq!(json["node_path"], serde_json::json!([1, 2, 3, 6]));
    assert_eq!(json["target"]["kind"], "room_on_undirected_edge");
    assert_eq!(json["polylines"]["ground"]["breaks"], serde_json::json!([3]));
}
