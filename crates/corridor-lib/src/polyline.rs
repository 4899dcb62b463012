use serde::Serialize;

use crate::error::Result;
use crate::geometry::{room_intersection, round_to};
use crate::graph::{Floor, GraphSnapshot, NodeId, Point};
use crate::location::{Location, LocationKind};

const COORDINATE_PLACES: i32 = 3;

/// Ordered points to draw on a single floor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloorPolyline {
    pub points: Vec<Point>,
    /// Indices into `points` after which no segment is drawn.
    pub breaks: Vec<usize>,
}

impl FloorPolyline {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    fn break_here(&mut self) {
        if let Some(last) = self.points.len().checked_sub(1) {
            if self.breaks.last() != Some(&last) {
                self.breaks.push(last);
            }
        }
    }

    /// Whether the segment from `points[index]` to `points[index + 1]` is drawn.
    pub fn draws_segment_after(&self, index: usize) -> bool {
        index + 1 < self.points.len() && !self.breaks.contains(&index)
    }
}

/// One polyline per floor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FloorPolylines {
    pub ground: FloorPolyline,
    pub first: FloorPolyline,
}

impl FloorPolylines {
    pub fn floor(&self, floor: Floor) -> &FloorPolyline {
        match floor {
            Floor::Ground => &self.ground,
            Floor::First => &self.first,
        }
    }

    fn floor_mut(&mut self, floor: Floor) -> &mut FloorPolyline {
        match floor {
            Floor::Ground => &mut self.ground,
            Floor::First => &mut self.first,
        }
    }

    fn rounded(mut self) -> Self {
        for line in [&mut self.ground, &mut self.first] {
            for point in &mut line.points {
                *point = Point::new(
                    round_to(point.x, COORDINATE_PLACES),
                    round_to(point.y, COORDINATE_PLACES),
                );
            }
        }
        self
    }
}

/// Lay out a graph route as per-floor polylines.
///
/// Room endpoints contribute their door and, for edge rooms, the connector
/// intersection. Edge vertices are inserted in travel order. A change of floor
/// mirrors the transition onto both floors and breaks the line on the floor
/// being left.
pub fn assemble_graph_path(
    graph: &GraphSnapshot,
    start: &Location,
    target: &Location,
    path: &[NodeId],
) -> Result<FloorPolylines> {
    let mut lines = FloorPolylines::default();

    match start.kind {
        LocationKind::RoomConnectedToNode => {
            lines.floor_mut(start.floor).push(start.coordinates);
        }
        kind if kind.is_edge_room() => {
            let room = graph.room(&start.id)?;
            let line = lines.floor_mut(start.floor);
            line.push(start.coordinates);
            line.push(room_intersection(graph, room)?);
        }
        _ => {}
    }

    for (position, &id) in path.iter().enumerate() {
        let node = graph.node(id)?;
        lines.floor_mut(node.floor).push(node.position);

        let Some(&next_id) = path.get(position + 1) else {
            continue;
        };
        let next = graph.node(next_id)?;
        let vertices = graph
            .edge_between(id, next_id)
            .map(|edge| edge.vertices_from(id))
            .unwrap_or_default();

        if next.floor == node.floor {
            lines.floor_mut(node.floor).points.extend(vertices);
        } else {
            let current = lines.floor_mut(node.floor);
            current.points.extend(vertices.iter().copied());
            current.push(next.position);
            current.break_here();

            let other = lines.floor_mut(next.floor);
            other.break_here();
            other.push(node.position);
            other.points.extend(vertices);
        }
    }

    match target.kind {
        LocationKind::RoomConnectedToNode => {
            lines.floor_mut(target.floor).push(target.coordinates);
        }
        kind if kind.is_edge_room() => {
            let room = graph.room(&target.id)?;
            let line = lines.floor_mut(target.floor);
            line.push(room_intersection(graph, room)?);
            line.push(target.coordinates);
        }
        _ => {}
    }

    Ok(lines.rounded())
}

/// Polyline for two rooms on the same edge: door, intersection, intersection, door.
pub fn assemble_direct_path(
    graph: &GraphSnapshot,
    start: &Location,
    target: &Location,
) -> Result<FloorPolylines> {
    let mut lines = FloorPolylines::default();
    let line = lines.floor_mut(start.floor);
    line.push(start.coordinates);
    line.push(room_intersection(graph, graph.room(&start.id)?)?);
    line.push(room_intersection(graph, graph.room(&target.id)?)?);
    line.push(target.coordinates);
    Ok(lines.rounded())
}
