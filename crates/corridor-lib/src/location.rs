use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::ResolutionError;
use crate::graph::{EdgeId, Floor, GraphSnapshot, Node, NodeId, Point, Room, RoomAttachment};
use crate::settings::AccessMode;

const MAX_SUGGESTIONS: usize = 3;

/// How a resolved endpoint is attached to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Node,
    RoomIsNode,
    RoomConnectedToNode,
    RoomOnUndirectedEdge,
    RoomOnDirectedEdge,
}

impl LocationKind {
    pub fn is_room(self) -> bool {
        self != LocationKind::Node
    }

    pub fn is_edge_room(self) -> bool {
        matches!(
            self,
            LocationKind::RoomOnUndirectedEdge | LocationKind::RoomOnDirectedEdge
        )
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LocationKind::Node => "node",
            LocationKind::RoomIsNode => "room at node",
            LocationKind::RoomConnectedToNode => "room connected to node",
            LocationKind::RoomOnUndirectedEdge => "room on corridor",
            LocationKind::RoomOnDirectedEdge => "room on one-way corridor",
        };
        f.write_str(label)
    }
}

/// Graph element a location hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Node(NodeId),
    Edge(EdgeId),
}

/// A routing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Room id, or the node id rendered as text.
    pub id: String,
    pub kind: LocationKind,
    pub floor: Floor,
    pub coordinates: Point,
    pub display_name: String,
    pub anchor: Anchor,
    /// Node the route starts or ends at. Set by route finding.
    pub resolved_node: Option<NodeId>,
}

impl Location {
    pub fn for_node(node: &Node) -> Self {
        Self {
            id: node.id.to_string(),
            kind: LocationKind::Node,
            floor: node.floor,
            coordinates: node.position,
            display_name: node
                .name
                .clone()
                .unwrap_or_else(|| format!("Node {}", node.id)),
            anchor: Anchor::Node(node.id),
            resolved_node: None,
        }
    }

    /// Classify a room. Edge rooms count as directed only when the edge is
    /// one-way and the access mode follows one-way restrictions.
    pub fn for_room(
        graph: &GraphSnapshot,
        room: &Room,
        access: AccessMode,
    ) -> crate::Result<Self> {
        let floor = graph.room_floor(room)?;
        let (kind, coordinates, anchor) = match room.attachment {
            RoomAttachment::Node { node, door: None } => (
                LocationKind::RoomIsNode,
                graph.node(node)?.position,
                Anchor::Node(node),
            ),
            RoomAttachment::Node {
                node,
                door: Some(door),
            } => (LocationKind::RoomConnectedToNode, door, Anchor::Node(node)),
            RoomAttachment::Edge { edge, door, .. } => {
                let kind = if graph.edge(edge)?.one_way && access.honours_one_way() {
                    LocationKind::RoomOnDirectedEdge
                } else {
                    LocationKind::RoomOnUndirectedEdge
                };
                (kind, door, Anchor::Edge(edge))
            }
        };

        Ok(Self {
            id: room.id.clone(),
            kind,
            floor,
            coordinates,
            display_name: room.name.clone().unwrap_or_else(|| room.id.clone()),
            anchor,
            resolved_node: None,
        })
    }

    /// Whether two locations name the same place.
    pub fn same_place(&self, other: &Location) -> bool {
        self.id == other.id && self.anchor == other.anchor
    }
}

/// Turns user text into a [`Location`].
///
/// Rules are tried in order and the first hit wins:
/// room id (case-insensitive), exact room name (first by room id), unique room
/// name substring, node id, exact node name, unique node name substring.
/// Substring matching ignores ASCII case.
pub struct LocationResolver<'a> {
    graph: &'a GraphSnapshot,
    access: AccessMode,
}

impl<'a> LocationResolver<'a> {
    pub fn new(graph: &'a GraphSnapshot, access: AccessMode) -> Self {
        Self { graph, access }
    }

    pub fn resolve(&self, text: &str) -> Result<Location, ResolutionError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(ResolutionError::Empty);
        }
        let needle = query.to_lowercase();

        if let Some(room) = self.graph.rooms().find(|room| room.id.eq_ignore_ascii_case(query)) {
            debug!(query, rule = "room_id", room = %room.id, "resolved location");
            return self.room_location(room, query);
        }

        // Shared names resolve to the lowest room id.
        if let Some(room) = self.graph.rooms().find(|room| room.name.as_deref() == Some(query)) {
            debug!(query, rule = "room_name", room = %room.id, "resolved location");
            return self.room_location(room, query);
        }

        let partial_rooms: Vec<&Room> = self
            .graph
            .rooms()
            .filter(|room| contains_ignore_case(room.name.as_deref(), &needle))
            .collect();
        if let [room] = partial_rooms.as_slice() {
            debug!(query, rule = "room_name_substring", room = %room.id, "resolved location");
            return self.room_location(room, query);
        }

        if let Ok(id) = query.parse::<NodeId>() {
            if let Ok(node) = self.graph.node(id) {
                debug!(query, rule = "node_id", node = id, "resolved location");
                return Ok(Location::for_node(node));
            }
        }

        let exact_nodes: Vec<&Node> = self
            .graph
            .nodes()
            .filter(|node| node.name.as_deref() == Some(query))
            .collect();
        if let [node] = exact_nodes.as_slice() {
            debug!(query, rule = "node_name", node = node.id, "resolved location");
            return Ok(Location::for_node(node));
        }

        let partial_nodes: Vec<&Node> = self
            .graph
            .nodes()
            .filter(|node| contains_ignore_case(node.name.as_deref(), &needle))
            .collect();
        if let [node] = partial_nodes.as_slice() {
            debug!(query, rule = "node_name_substring", node = node.id, "resolved location");
            return Ok(Location::for_node(node));
        }

        if partial_rooms.len() > 1 || partial_nodes.len() > 1 {
            return Err(ResolutionError::Ambiguous {
                query: query.to_string(),
                matches: partial_rooms.len() + partial_nodes.len(),
            });
        }

        Err(ResolutionError::NotFound {
            query: query.to_string(),
            suggestions: self.graph.fuzzy_name_matches(query, MAX_SUGGESTIONS),
        })
    }

    fn room_location(&self, room: &Room, query: &str) -> Result<Location, ResolutionError> {
        // Snapshots only hold rooms whose attachment exists, so this only
        // fails on a snapshot built around broken geometry.
        Location::for_room(self.graph, room, self.access).map_err(|err| {
            debug!(query, error = %err, "room failed to classify");
            ResolutionError::NotFound {
                query: query.to_string(),
                suggestions: Vec::new(),
            }
        })
    }
}

fn contains_ignore_case(name: Option<&str>, needle: &str) -> bool {
    name.is_some_and(|name| name.to_lowercase().contains(needle))
}
