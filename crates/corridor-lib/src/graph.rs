use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::settings::{StoreSettings, VelocityTable};

/// Numeric identifier for a graph node, assigned by the store.
pub type NodeId = i64;

/// Numeric identifier for an edge, assigned by the store.
pub type EdgeId = i64;

/// Minimum Jaro-Winkler similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// World-space coordinate on a floor plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate the Euclidean distance to another point.
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Building floor. Only the ground and first floor are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Floor {
    Ground,
    First,
}

impl Floor {
    /// Floor number as stored (0 or 1).
    pub fn number(self) -> i64 {
        match self {
            Floor::Ground => 0,
            Floor::First => 1,
        }
    }
}

impl TryFrom<i64> for Floor {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Floor::Ground),
            1 => Ok(Floor::First),
            floor => Err(Error::InvalidFloor { floor }),
        }
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Classification of a walkable connection, stored as a single character tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// `O`: outdoor path.
    Outside,
    /// `I`: indoor corridor.
    Inside,
    /// `C`: corridor that is commonly congested.
    Congested,
    /// `S`: staircase.
    Stairs,
    /// `L`: lift.
    Lift,
}

impl EdgeType {
    pub const ALL: [EdgeType; 5] = [
        EdgeType::Outside,
        EdgeType::Inside,
        EdgeType::Congested,
        EdgeType::Stairs,
        EdgeType::Lift,
    ];

    /// Single-character tag used by the store.
    pub fn tag(self) -> char {
        match self {
            EdgeType::Outside => 'O',
            EdgeType::Inside => 'I',
            EdgeType::Congested => 'C',
            EdgeType::Stairs => 'S',
            EdgeType::Lift => 'L',
        }
    }

    pub fn from_tag(tag: char) -> Result<Self> {
        EdgeType::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| Error::UnknownEdgeType {
                tag: tag.to_string(),
            })
    }
}

impl FromStr for EdgeType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(tag), None) => EdgeType::from_tag(tag),
            _ => Err(Error::UnknownEdgeType {
                tag: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.tag())
    }
}

/// Point in the routing graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub floor: Floor,
    pub name: Option<String>,
}

/// Weighted connection between two nodes.
///
/// One-way edges may only be traversed from `node_a` to `node_b`. Interior
/// `vertices` are ordered from `node_a` towards `node_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    /// Real-world length in metres.
    pub weight: f64,
    pub edge_type: EdgeType,
    pub one_way: bool,
    pub vertices: Vec<Point>,
}

impl Edge {
    /// Whether this edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.node_a == a && self.node_b == b) || (self.node_a == b && self.node_b == a)
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.node_a {
            Some(self.node_b)
        } else if node == self.node_b {
            Some(self.node_a)
        } else {
            None
        }
    }

    /// Interior vertices in travel order when leaving from `from`.
    pub fn vertices_from(&self, from: NodeId) -> Vec<Point> {
        if from == self.node_a {
            self.vertices.clone()
        } else {
            self.vertices.iter().rev().copied().collect()
        }
    }
}

/// How a room is attached to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomAttachment {
    /// The room sits on a node. `door` is set when the room has its own coordinate.
    Node { node: NodeId, door: Option<Point> },
    /// The room opens onto an edge. The connector leaves `door` at
    /// `connector_angle` degrees and meets the edge.
    Edge {
        edge: EdgeId,
        door: Point,
        connector_angle: f64,
    },
}

/// Routing destination that is not itself a graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: Option<String>,
    pub attachment: RoomAttachment,
}

impl Room {
    pub fn edge_attachment(&self) -> Option<(EdgeId, Point, f64)> {
        match self.attachment {
            RoomAttachment::Edge {
                edge,
                door,
                connector_angle,
            } => Some((edge, door, connector_angle)),
            RoomAttachment::Node { .. } => None,
        }
    }
}

/// Source of raw graph records and settings.
///
/// The SQLite store in [`crate::db`] is the production implementation.
pub trait GraphStore {
    fn nodes(&self) -> Result<Vec<Node>>;
    fn edges(&self) -> Result<Vec<Edge>>;
    fn rooms(&self) -> Result<Vec<Room>>;
    fn velocities(&self) -> Result<VelocityTable>;
    fn settings(&self) -> Result<StoreSettings>;
}

/// Immutable in-memory copy of the graph used for one routing session.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    rooms: BTreeMap<String, Room>,
    velocities: VelocityTable,
    settings: StoreSettings,
}

impl GraphSnapshot {
    /// Assemble a snapshot, dropping edges and rooms that reference records
    /// missing from the snapshot.
    pub fn new(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        rooms: Vec<Room>,
        velocities: VelocityTable,
        settings: StoreSettings,
    ) -> Self {
        let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, n)).collect();

        let mut skipped_edges = 0usize;
        let mut kept_edges = BTreeMap::new();
        for edge in edges {
            if !nodes.contains_key(&edge.node_a) || !nodes.contains_key(&edge.node_b) {
                skipped_edges += 1;
                continue;
            }
            kept_edges.insert(edge.id, edge);
        }

        let mut skipped_rooms = 0usize;
        let mut kept_rooms = BTreeMap::new();
        for room in rooms {
            let attached = match room.attachment {
                RoomAttachment::Node { node, .. } => nodes.contains_key(&node),
                RoomAttachment::Edge { edge, .. } => kept_edges.contains_key(&edge),
            };
            if !attached {
                skipped_rooms += 1;
                continue;
            }
            kept_rooms.insert(room.id.clone(), room);
        }

        if skipped_edges > 0 {
            warn!(skipped_edges, "ignored edges referencing unknown nodes");
        }
        if skipped_rooms > 0 {
            warn!(skipped_rooms, "ignored rooms attached to unknown nodes or edges");
        }
        debug!(
            nodes = nodes.len(),
            edges = kept_edges.len(),
            rooms = kept_rooms.len(),
            "graph snapshot assembled"
        );

        Self {
            nodes,
            edges: kept_edges,
            rooms: kept_rooms,
            velocities,
            settings,
        }
    }

    /// Read every record from a store into a snapshot.
    pub fn from_store(store: &impl GraphStore) -> Result<Self> {
        Ok(Self::new(
            store.nodes()?,
            store.edges()?,
            store.rooms()?,
            store.velocities()?,
            store.settings()?,
        ))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn velocities(&self) -> &VelocityTable {
        &self.velocities
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(Error::UnknownNode { id })
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(&id).ok_or(Error::UnknownEdge { id })
    }

    pub fn room(&self, id: &str) -> Result<&Room> {
        self.rooms.get(id).ok_or_else(|| Error::UnknownRoom { id: id.to_string() })
    }

    /// Lowest-numbered edge joining `a` and `b` in either direction.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.edges.values().find(|edge| edge.connects(a, b))
    }

    /// Floor a room is physically on. Edge rooms take the floor of the
    /// edge's first node.
    pub fn room_floor(&self, room: &Room) -> Result<Floor> {
        match room.attachment {
            RoomAttachment::Node { node, .. } => Ok(self.node(node)?.floor),
            RoomAttachment::Edge { edge, .. } => {
                let edge = self.edge(edge)?;
                Ok(self.node(edge.node_a)?.floor)
            }
        }
    }

    /// Room and node names most similar to `query`, best first.
    pub fn fuzzy_name_matches(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = query.to_lowercase();
        let names = self
            .rooms
            .values()
            .flat_map(|room| std::iter::once(room.id.as_str()).chain(room.name.as_deref()))
            .chain(self.nodes.values().filter_map(|node| node.name.as_deref()));

        let mut scored: Vec<(f64, &str)> = names
            .map(|name| (strsim::jaro_winkler(&needle, &name.to_lowercase()), name))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });

        let mut suggestions: Vec<String> = Vec::new();
        for (_, name) in scored {
            if suggestions.len() == limit {
                break;
            }
            if !suggestions.iter().any(|existing| existing == name) {
                suggestions.push(name.to_string());
            }
        }
        suggestions
    }
}
