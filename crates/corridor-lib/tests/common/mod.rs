//! Shared fixtures for integration tests.
//!
//! The campus fixture is materialised from `docs/fixtures/campus.sql` into a
//! temporary SQLite file so the loader is exercised exactly as in production.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveTime;
use corridor_lib::{
    build_matrices, load_graph, AccessMode, Edge, EdgeType, Floor, GraphSnapshot, Location,
    LocationResolver, MatrixBundle, Node, NodeId, Point, RoutingSettings, StoreSettings,
    VelocityTable,
};
use rusqlite::Connection;
use tempfile::TempDir;

/// Path to fixtures directory shared by every crate.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

/// Temporary SQLite copy of the campus fixture.
pub struct CampusDb {
    _temp_dir: TempDir,
    pub path: PathBuf,
}

#[allow(dead_code)]
impl CampusDb {
    pub fn new() -> Self {
        Self::with_extra_sql("")
    }

    /// Build the campus and then run `extra` against it.
    pub fn with_extra_sql(extra: &str) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("campus.db");
        let sql = fs::read_to_string(fixtures_dir().join("campus.sql")).expect("read campus.sql");

        let connection = Connection::open(&path).expect("create fixture db");
        connection.execute_batch(&sql).expect("apply campus.sql");
        if !extra.is_empty() {
            connection.execute_batch(extra).expect("apply extra fixture sql");
        }
        drop(connection);

        Self {
            _temp_dir: temp_dir,
            path,
        }
    }

    pub fn load(&self) -> GraphSnapshot {
        load_graph(&self.path).expect("campus fixture loads")
    }
}

/// Campus snapshot loaded through the SQLite store.
#[allow(dead_code)]
pub fn campus() -> GraphSnapshot {
    CampusDb::new().load()
}

#[allow(dead_code)]
pub fn settings(access: AccessMode, use_congestion: bool) -> RoutingSettings {
    RoutingSettings {
        access,
        use_congestion,
    }
}

/// Matrices for `access` with congestion off.
#[allow(dead_code)]
pub fn bundle(graph: &GraphSnapshot, access: AccessMode) -> MatrixBundle {
    build_matrices(graph, &settings(access, false), false).expect("matrices build")
}

#[allow(dead_code)]
pub fn resolve(graph: &GraphSnapshot, access: AccessMode, query: &str) -> Location {
    LocationResolver::new(graph, access)
        .resolve(query)
        .unwrap_or_else(|err| panic!("resolve {query}: {err}"))
}

#[allow(dead_code)]
pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

#[allow(dead_code)]
pub fn node(id: NodeId, x: f64, y: f64) -> Node {
    Node {
        id,
        position: Point::new(x, y),
        floor: Floor::Ground,
        name: None,
    }
}

#[allow(dead_code)]
pub fn edge(id: i64, a: NodeId, b: NodeId, weight: f64, one_way: bool) -> Edge {
    Edge {
        id,
        node_a: a,
        node_b: b,
        weight,
        edge_type: EdgeType::Inside,
        one_way,
        vertices: Vec::new(),
    }
}

/// Indoor-only velocity table with a walking speed of 1 m/s.
#[allow(dead_code)]
pub fn unit_velocities() -> VelocityTable {
    VelocityTable::new().with(EdgeType::Inside, 1.0, 0.5)
}

/// Small in-memory graph of ground-floor nodes joined by indoor edges.
#[allow(dead_code)]
pub fn line_graph(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphSnapshot {
    GraphSnapshot::new(
        nodes,
        edges,
        Vec::new(),
        unit_velocities(),
        StoreSettings::default(),
    )
}
