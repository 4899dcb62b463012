//! Text and JSON rendering for resolved locations and routes.

use std::fmt::Write;

use chrono::NaiveTime;
use corridor_lib::{Floor, FloorPolyline, GraphSnapshot, Location, NodeId, Route, RouteStrategy};
use serde::Serialize;

pub const STATIONARY_NOTICE: &str = "Start and destination are the same location; nothing to route.";

/// JSON envelope for a route with its timing context.
#[derive(Debug, Serialize)]
pub struct RouteReport<'a> {
    pub departure: String,
    pub arrival: String,
    pub congested: bool,
    #[serde(flatten)]
    pub route: &'a Route,
}

impl<'a> RouteReport<'a> {
    pub fn new(route: &'a Route, departure: NaiveTime, congested: bool) -> Self {
        Self {
            departure: departure.format("%H:%M:%S").to_string(),
            arrival: route.arrival_time(departure).format("%H:%M").to_string(),
            congested,
            route,
        }
    }
}

pub fn render_location(location: &Location) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", location.display_name, location.id);
    let _ = writeln!(out, "  kind: {}", location.kind);
    let _ = writeln!(out, "  floor: {}", location.floor);
    let _ = writeln!(
        out,
        "  coordinates: ({:.3}, {:.3})",
        location.coordinates.x, location.coordinates.y
    );
    out
}

pub fn render_route(graph: &GraphSnapshot, route: &Route, departure: NaiveTime) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Route from {} to {} (strategy: {}):",
        route.start.display_name,
        route.target.display_name,
        strategy_label(route.strategy)
    );
    let _ = writeln!(out, "Time: {}", format_duration(route.time_seconds));
    let _ = writeln!(
        out,
        "Arrival: {}",
        route.arrival_time(departure).format("%H:%M")
    );
    let _ = writeln!(out, "Distance: {:.1} m", route.distance_metres);

    if !route.node_path.is_empty() {
        let names: Vec<String> = route
            .node_path
            .iter()
            .map(|&id| node_label(graph, id))
            .collect();
        let _ = writeln!(out, "Path: {}", names.join(" -> "));
    }

    for floor in [Floor::Ground, Floor::First] {
        let line = route.polylines.floor(floor);
        if !line.is_empty() {
            let _ = writeln!(out, "Floor {}: {}", floor, describe_polyline(line));
        }
    }
    out
}

/// `M minutes S seconds`, from a time rounded to whole seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as u64;
    format!("{} minutes {} seconds", total / 60, total % 60)
}

fn strategy_label(strategy: RouteStrategy) -> &'static str {
    match strategy {
        RouteStrategy::Graph => "graph",
        RouteStrategy::Direct => "direct",
        RouteStrategy::Stationary => "stationary",
    }
}

fn node_label(graph: &GraphSnapshot, id: NodeId) -> String {
    graph
        .node(id)
        .ok()
        .and_then(|node| node.name.clone())
        .unwrap_or_else(|| format!("Node {id}"))
}

fn describe_polyline(line: &FloorPolyline) -> String {
    let points = line.points.len();
    let breaks = line.breaks.len();
    format!(
        "{points} point{}, {breaks} break{}",
        if points == 1 { "" } else { "s" },
        if breaks == 1 { "" } else { "s" }
    )
}
