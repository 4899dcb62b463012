use std::path::PathBuf;

use thiserror::Error;

use crate::graph::{EdgeId, EdgeType, NodeId};

/// Convenient result alias for the corridor library.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised while loading a graph store or building matrices.
///
/// These indicate broken configuration or data. A matrix bundle is never
/// produced when one of these is raised.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a store contains an edge type tag outside `O`, `I`, `C`, `S`, `L`.
    #[error("unknown edge type tag '{tag}'")]
    UnknownEdgeType { tag: String },

    /// Raised when the velocity table has no entry for an edge type in use.
    #[error("no velocity configured for edge type {edge_type}")]
    MissingVelocity { edge_type: EdgeType },

    /// Raised when a velocity is zero, negative or not finite.
    #[error("velocity for edge type {edge_type} must be positive, got {value}")]
    InvalidVelocity { edge_type: EdgeType, value: f64 },

    /// Raised when an edge weight would collide with the "no edge" cell.
    #[error("edge {edge} has non-positive weight {weight}")]
    InvalidEdgeWeight { edge: EdgeId, weight: f64 },

    /// Raised when a room connector never meets the edge it is attached to.
    #[error("connector of room {room} at {angle} degrees does not meet edge {edge}")]
    DegenerateGeometry {
        room: String,
        edge: EdgeId,
        angle: f64,
    },

    /// Raised when a floor number other than 0 or 1 is encountered.
    #[error("unsupported floor {floor}; expected 0 or 1")]
    InvalidFloor { floor: i64 },

    /// Raised when a node identifier is not part of the graph snapshot.
    #[error("unknown node {id}")]
    UnknownNode { id: NodeId },

    /// Raised when an edge identifier is not part of the graph snapshot.
    #[error("unknown edge {id}")]
    UnknownEdge { id: EdgeId },

    /// Raised when a room identifier is not part of the graph snapshot.
    #[error("unknown room {id}")]
    UnknownRoom { id: String },

    /// Raised when a room record references both a node and an edge, or neither.
    #[error("room {id} must be attached to exactly one node or one edge")]
    InvalidRoomAttachment { id: String },

    /// Raised when a setting value cannot be parsed.
    #[error("invalid setting {name}: {message}")]
    InvalidSetting { name: String, message: String },

    /// Graph store could not be located at the resolved path.
    #[error("graph store not found at {path}")]
    StoreNotFound { path: PathBuf },

    /// Raised when the store does not expose the expected tables.
    #[error("unsupported graph store schema; expected nodes, edges, rooms, edge_types and settings tables")]
    UnsupportedSchema,

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recoverable failures while turning user text into a [`crate::Location`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// Nothing was entered.
    #[error("please enter a location")]
    Empty,

    /// No room or node matched the query.
    #[error("location not found: {query}{}", format_suggestions(.suggestions))]
    NotFound {
        query: String,
        suggestions: Vec<String>,
    },

    /// The query is a substring of several room or node names.
    #[error("location '{query}' was too vague; it matches {matches} names")]
    Ambiguous { query: String, matches: usize },
}

/// Failures while computing a route between two resolved locations.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Start and target are the same location.
    #[error("the start location is the same as the target location")]
    SameStartAndTarget,

    /// No edge leaves the start location in the current access mode.
    #[error("no route leaves {location} in the current access mode")]
    StartUnreachable { location: String },

    /// The target cannot be reached in the current access mode.
    #[error("no route reaches {location} in the current access mode")]
    TargetUnreachable { location: String },

    /// Backtracking found no predecessor before reaching the start node.
    #[error("no predecessor found for node {node}; shortest-path distances disagree with the time matrix")]
    InconsistentPathState { node: NodeId },

    /// A fatal data or configuration error surfaced during the query.
    #[error(transparent)]
    Configuration(#[from] Error),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
