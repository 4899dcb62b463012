//! Corridor routing engine.
//!
//! Loads an indoor, two-floor walking graph from a SQLite store, builds the
//! time and distance matrices for an access mode, resolves user text into
//! routing endpoints and computes the fastest route between them together
//! with the polylines to draw on each floor. Front ends (the CLI) should only
//! depend on the items exported here.
//!

#![deny(warnings)]

pub mod db;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod location;
pub mod matrix;
pub mod path;
pub mod polyline;
pub mod routing;
pub mod settings;

pub use db::{load_graph, SqliteStore};
pub use error::{Error, ResolutionError, Result, RouteError};
pub use graph::{
    Edge, EdgeId, EdgeType, Floor, GraphSnapshot, GraphStore, Node, NodeId, Point, Room,
    RoomAttachment,
};
pub use location::{Anchor, Location, LocationKind, LocationResolver};
pub use matrix::{build_matrices, build_matrices_at, Matrix, MatrixBundle, MatrixCache, NodeIndex};
pub use path::{backtrack, dijkstra, path_distance};
pub use polyline::{FloorPolyline, FloorPolylines};
pub use routing::{find_route, select_strategy, Route, RouteStrategy, RoutingPlan};
pub use settings::{AccessMode, CongestionSchedule, RoutingSettings, StoreSettings, VelocityTable};
