use std::collections::HashMap;

use chrono::{NaiveTime, TimeDelta, Timelike};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, RouteError};
use crate::geometry::{partial_edge_distance, partial_edge_time, round_to};
use crate::graph::{GraphSnapshot, NodeId, Room};
use crate::location::{Anchor, Location, LocationKind};
use crate::matrix::{estimate_time, Matrix, MatrixBundle};
use crate::path::{backtrack, dijkstra, path_distance};
use crate::polyline::{assemble_direct_path, assemble_graph_path, FloorPolylines};

/// How a route was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Shortest path through the node graph.
    Graph,
    /// Straight along a shared edge between two rooms.
    Direct,
    /// Start and target are the same place.
    Stationary,
}

/// Candidate nodes the route may start from and end at, in preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingPlan {
    pub start_candidates: Vec<NodeId>,
    pub target_candidates: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Start,
    Target,
}

impl RoutingPlan {
    pub fn for_locations(graph: &GraphSnapshot, start: &Location, target: &Location) -> crate::Result<Self> {
        Ok(Self {
            start_candidates: candidate_nodes(graph, start, Endpoint::Start)?,
            target_candidates: candidate_nodes(graph, target, Endpoint::Target)?,
        })
    }
}

/// Rooms on a directed edge leave through its far end and are entered from
/// its near end. Every other edge room may use either end.
fn candidate_nodes(graph: &GraphSnapshot, location: &Location, endpoint: Endpoint) -> crate::Result<Vec<NodeId>> {
    match location.anchor {
        Anchor::Node(node) => Ok(vec![node]),
        Anchor::Edge(edge) => {
            let edge = graph.edge(edge)?;
            Ok(match (location.kind, endpoint) {
                (LocationKind::RoomOnDirectedEdge, Endpoint::Start) => vec![edge.node_b],
                (LocationKind::RoomOnDirectedEdge, Endpoint::Target) => vec![edge.node_a],
                _ => vec![edge.node_a, edge.node_b],
            })
        }
    }
}

/// A computed route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub strategy: RouteStrategy,
    pub start: Location,
    pub target: Location,
    pub time_seconds: f64,
    pub distance_metres: f64,
    pub node_path: Vec<NodeId>,
    pub polylines: FloorPolylines,
}

impl Route {
    /// Time of day the route ends when leaving at `departure`, truncated to the minute.
    pub fn arrival_time(&self, departure: NaiveTime) -> NaiveTime {
        let travel = TimeDelta::milliseconds((self.time_seconds * 1000.0).round() as i64);
        let arrival = departure + travel;
        arrival
            .with_second(0)
            .and_then(|time| time.with_nanosecond(0))
            .unwrap_or(arrival)
    }

    /// Reject a stationary route.
    pub fn require_movement(self) -> Result<Self, RouteError> {
        match self.strategy {
            RouteStrategy::Stationary => Err(RouteError::SameStartAndTarget),
            _ => Ok(self),
        }
    }
}

/// Decide between graph traversal and direct travel along a shared edge.
///
/// Two rooms on the same edge use direct travel unless the edge is directed
/// and the target lies upstream of the start.
pub fn select_strategy(
    graph: &GraphSnapshot,
    start: &Location,
    target: &Location,
) -> crate::Result<RouteStrategy> {
    if start.same_place(target) {
        return Ok(RouteStrategy::Stationary);
    }
    let (Anchor::Edge(start_edge), Anchor::Edge(target_edge)) = (start.anchor, target.anchor) else {
        return Ok(RouteStrategy::Graph);
    };
    if start_edge != target_edge {
        return Ok(RouteStrategy::Graph);
    }

    if start.kind == LocationKind::RoomOnDirectedEdge {
        let node_a = graph.edge(start_edge)?.node_a;
        let from_start = partial_edge_distance(graph, node_a, graph.room(&start.id)?)?;
        let from_target = partial_edge_distance(graph, node_a, graph.room(&target.id)?)?;
        if from_start >= from_target {
            return Ok(RouteStrategy::Graph);
        }
    }
    Ok(RouteStrategy::Direct)
}

/// Compute the fastest route between two resolved locations.
///
/// The returned locations carry the node each end was routed through.
pub fn find_route(
    graph: &GraphSnapshot,
    bundle: &MatrixBundle,
    start: &Location,
    target: &Location,
) -> Result<Route, RouteError> {
    let strategy = select_strategy(graph, start, target)?;
    debug!(start = %start.id, target = %target.id, ?strategy, "selected routing strategy");

    match strategy {
        RouteStrategy::Stationary => Ok(Route {
            strategy,
            start: start.clone(),
            target: target.clone(),
            time_seconds: 0.0,
            distance_metres: 0.0,
            node_path: Vec::new(),
            polylines: FloorPolylines::default(),
        }),
        RouteStrategy::Direct => direct_route(graph, bundle, start, target),
        RouteStrategy::Graph => graph_route(graph, bundle, start, target),
    }
}

fn direct_route(
    graph: &GraphSnapshot,
    bundle: &MatrixBundle,
    start: &Location,
    target: &Location,
) -> Result<Route, RouteError> {
    let start_room = graph.room(&start.id)?;
    let target_room = graph.room(&target.id)?;
    let Anchor::Edge(edge_id) = start.anchor else {
        return Err(Error::InvalidRoomAttachment {
            id: start.id.clone(),
        }
        .into());
    };
    let edge = graph.edge(edge_id)?;

    let start_from_a = partial_edge_distance(graph, edge.node_a, start_room)?;
    let target_from_a = partial_edge_distance(graph, edge.node_a, target_room)?;
    let outer = if start_from_a < target_from_a {
        start_from_a + partial_edge_distance(graph, edge.node_b, target_room)?
    } else {
        partial_edge_distance(graph, edge.node_b, start_room)? + target_from_a
    };
    let distance = round_to((edge.weight - outer).max(0.0), 1);
    let time = estimate_time(graph, distance, edge.edge_type, bundle.congested())?;

    info!(edge = edge_id, distance, time, "direct route along shared edge");
    Ok(Route {
        strategy: RouteStrategy::Direct,
        start: start.clone(),
        target: target.clone(),
        time_seconds: time,
        distance_metres: distance,
        node_path: Vec::new(),
        polylines: assemble_direct_path(graph, start, target)?,
    })
}

struct Choice {
    start: NodeId,
    target: NodeId,
    cost: f64,
}

fn graph_route(
    graph: &GraphSnapshot,
    bundle: &MatrixBundle,
    start: &Location,
    target: &Location,
) -> Result<Route, RouteError> {
    let plan = RoutingPlan::for_locations(graph, start, target)?;
    let nodes = bundle.nodes();
    let times = purged_time_matrix(graph, bundle, start, target);
    let congested = bundle.congested();

    let start_room = edge_room(graph, start)?;
    let target_room = edge_room(graph, target)?;

    let mut runs: HashMap<NodeId, Vec<f64>> = HashMap::new();
    let mut best: Option<Choice> = None;
    for &start_node in &plan.start_candidates {
        let start_index = nodes.require(start_node)?;
        let distances = runs
            .entry(start_node)
            .or_insert_with(|| dijkstra(&times, start_index));
        let start_leg = match start_room {
            Some(room) => partial_edge_time(graph, start_node, room, congested)?,
            None => 0.0,
        };

        for &target_node in &plan.target_candidates {
            let reached = distances[nodes.require(target_node)?];
            if !reached.is_finite() {
                continue;
            }
            let target_leg = match target_room {
                Some(room) => partial_edge_time(graph, target_node, room, congested)?,
                None => 0.0,
            };
            let cost = reached + start_leg + target_leg;
            debug!(start_node, target_node, cost, "evaluated candidate pair");
            if best.as_ref().map_or(true, |choice| cost < choice.cost) {
                best = Some(Choice {
                    start: start_node,
                    target: target_node,
                    cost,
                });
            }
        }
    }

    let Some(choice) = best else {
        let stranded = plan
            .start_candidates
            .iter()
            .filter_map(|&node| nodes.index_of(node))
            .all(|index| !times.has_outgoing(index));
        return Err(if stranded {
            RouteError::StartUnreachable {
                location: start.display_name.clone(),
            }
        } else {
            RouteError::TargetUnreachable {
                location: target.display_name.clone(),
            }
        });
    };

    let start_index = nodes.require(choice.start)?;
    let target_index = nodes.require(choice.target)?;
    let distances = runs
        .get(&choice.start)
        .ok_or(RouteError::InconsistentPathState { node: choice.start })?;
    let indices = backtrack(&times, nodes, distances, start_index, target_index)?;
    let node_path: Vec<NodeId> = indices.iter().map(|&index| nodes.id_at(index)).collect();

    let mut distance = path_distance(bundle.distance_matrix(), bundle.info_matrix(), nodes, &indices)?;
    if let Some(room) = start_room {
        distance += partial_edge_distance(graph, choice.start, room)?;
    }
    if let Some(room) = target_room {
        distance += partial_edge_distance(graph, choice.target, room)?;
    }

    let mut start = start.clone();
    let mut target = target.clone();
    start.resolved_node = Some(choice.start);
    target.resolved_node = Some(choice.target);

    let polylines = assemble_graph_path(graph, &start, &target, &node_path)?;
    let route = Route {
        strategy: RouteStrategy::Graph,
        time_seconds: round_to(choice.cost, 1),
        distance_metres: round_to(distance, 1),
        node_path,
        polylines,
        start,
        target,
    };
    info!(
        start = %route.start.id,
        target = %route.target.id,
        time = route.time_seconds,
        distance = route.distance_metres,
        hops = route.node_path.len(),
        "route found"
    );
    Ok(route)
}

fn edge_room<'g>(graph: &'g GraphSnapshot, location: &Location) -> crate::Result<Option<&'g Room>> {
    if location.kind.is_edge_room() {
        graph.room(&location.id).map(Some)
    } else {
        Ok(None)
    }
}

/// Copy of the bundle's time matrix with gate nodes cut out, unless either
/// endpoint is a bare node at the site boundary.
fn purged_time_matrix(
    graph: &GraphSnapshot,
    bundle: &MatrixBundle,
    start: &Location,
    target: &Location,
) -> Matrix<f64> {
    let mut times = bundle.time_matrix().clone();
    let settings = graph.settings();
    let at_boundary = |location: &Location| match (location.kind, location.anchor) {
        (LocationKind::Node, Anchor::Node(node)) => settings.is_boundary_node(node),
        _ => false,
    };
    if at_boundary(start) || at_boundary(target) {
        return times;
    }

    for &gate in &settings.gate_nodes {
        if let Some(index) = bundle.nodes().index_of(gate) {
            times.isolate(index);
        }
    }
    times
}
