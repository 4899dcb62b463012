//! Connector geometry for rooms attached to edges.
//!
//! A room on an edge reaches the edge along a straight connector leaving the
//! room door at a fixed angle. The point where the connector meets the edge
//! line splits the edge into two partial legs whose lengths are scaled to the
//! edge's real-world weight.

use crate::error::{Error, Result};
use crate::graph::{GraphSnapshot, NodeId, Point, Room};

const PARALLEL_EPSILON: f64 = 1e-9;

/// Round half to even at `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Intersection of the line through `a` and `b` with the connector leaving
/// `door` at `angle` degrees. Returns `None` when the two lines never meet.
pub fn connector_intersection(a: Point, b: Point, door: Point, angle: f64) -> Option<Point> {
    let angle = angle.rem_euclid(360.0);
    let edge_vertical = a.x == b.x;
    let edge_horizontal = a.y == b.y;

    let point = if angle == 90.0 || angle == 270.0 {
        if edge_horizontal {
            Point::new(door.x, a.y)
        } else if edge_vertical {
            return None;
        } else {
            let slope = (b.y - a.y) / (b.x - a.x);
            Point::new(door.x, slope * (door.x - a.x) + a.y)
        }
    } else if angle == 0.0 || angle == 180.0 {
        // A horizontal connector is only meaningful against a vertical edge.
        if edge_vertical && !edge_horizontal {
            Point::new(a.x, door.y)
        } else {
            return None;
        }
    } else {
        let connector_slope = angle.to_radians().tan();
        if edge_vertical {
            Point::new(a.x, connector_slope * (a.x - door.x) + door.y)
        } else {
            let edge_slope = (b.y - a.y) / (b.x - a.x);
            if (edge_slope - connector_slope).abs() < PARALLEL_EPSILON {
                return None;
            }
            let x = (edge_slope * a.x - connector_slope * door.x + door.y - a.y)
                / (edge_slope - connector_slope);
            Point::new(x, edge_slope * (x - a.x) + a.y)
        }
    };

    (point.x.is_finite() && point.y.is_finite()).then_some(point)
}

/// Point where an edge-attached room's connector meets its edge.
pub fn room_intersection(graph: &GraphSnapshot, room: &Room) -> Result<Point> {
    let (edge_id, door, angle) = room
        .edge_attachment()
        .ok_or_else(|| Error::InvalidRoomAttachment {
            id: room.id.clone(),
        })?;
    let edge = graph.edge(edge_id)?;
    let a = graph.node(edge.node_a)?.position;
    let b = graph.node(edge.node_b)?.position;

    connector_intersection(a, b, door, angle).ok_or_else(|| Error::DegenerateGeometry {
        room: room.id.clone(),
        edge: edge_id,
        angle,
    })
}

/// Check every edge-attached room against its edge.
///
/// Fails on the first room whose edge has zero length on the plan or whose
/// connector never meets the edge line.
pub fn validate_room_geometry(graph: &GraphSnapshot) -> Result<()> {
    for room in graph.rooms() {
        let Some((edge_id, _, angle)) = room.edge_attachment() else {
            continue;
        };
        let edge = graph.edge(edge_id)?;
        let a = graph.node(edge.node_a)?.position;
        let b = graph.node(edge.node_b)?.position;
        if a.distance_to(&b) == 0.0 {
            return Err(Error::DegenerateGeometry {
                room: room.id.clone(),
                edge: edge_id,
                angle,
            });
        }
        room_intersection(graph, room)?;
    }
    Ok(())
}

/// Real-world distance from `node` along the room's edge to the connector.
///
/// The chord from the node to the intersection is scaled by the ratio of the
/// edge weight to the straight-line length of the edge.
pub fn partial_edge_distance(graph: &GraphSnapshot, node: NodeId, room: &Room) -> Result<f64> {
    let (edge_id, _, angle) = room
        .edge_attachment()
        .ok_or_else(|| Error::InvalidRoomAttachment {
            id: room.id.clone(),
        })?;
    let edge = graph.edge(edge_id)?;
    let other = edge.other_end(node).ok_or(Error::UnknownNode { id: node })?;

    let from = graph.node(node)?.position;
    let to = graph.node(other)?.position;
    let span = from.distance_to(&to);
    if span == 0.0 {
        return Err(Error::DegenerateGeometry {
            room: room.id.clone(),
            edge: edge_id,
            angle,
        });
    }

    let intersection = room_intersection(graph, room)?;
    Ok(edge.weight * from.distance_to(&intersection) / span)
}

/// Walking time from `node` to the room along its edge, rounded to 0.1 s.
pub fn partial_edge_time(
    graph: &GraphSnapshot,
    node: NodeId,
    room: &Room,
    congested: bool,
) -> Result<f64> {
    let distance = partial_edge_distance(graph, node, room)?;
    let (edge_id, _, _) = room
        .edge_attachment()
        .ok_or_else(|| Error::InvalidRoomAttachment {
            id: room.id.clone(),
        })?;
    let velocity = graph
        .velocities()
        .get(graph.edge(edge_id)?.edge_type, congested)?;
    Ok(round_to(distance / velocity, 1))
}
