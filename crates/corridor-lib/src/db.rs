use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::{Edge, EdgeId, EdgeType, Floor, GraphSnapshot, GraphStore, Node, Point, Room, RoomAttachment};
use crate::settings::{
    parse_duration, parse_flag, parse_node_list, parse_time_of_day, StoreSettings, Velocity,
    VelocityTable,
};

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("nodes", &["node_id", "x", "y", "floor", "name"]),
    (
        "edges",
        &["edge_id", "node_1_id", "node_2_id", "weight", "edge_type", "one_way"],
    ),
    (
        "rooms",
        &["room_id", "room_name", "node_id", "edge_id", "x", "y", "door_angle"],
    ),
    ("edge_types", &["edge_type", "normal_velocity", "congestion_velocity"]),
    ("settings", &["setting_name", "setting_value"]),
];

const VERTEX_TABLE: (&str, &[&str]) = ("edge_vertices", &["edge_id", "vertex_order", "x", "y"]);

/// Graph store backed by a SQLite database.
///
/// The `edge_vertices` table is optional; without it every edge is drawn as a
/// straight line between its nodes.
pub struct SqliteStore {
    connection: Connection,
    has_vertices: bool,
}

impl SqliteStore {
    /// Open the database read-only and verify its schema.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::StoreNotFound {
                path: path.to_path_buf(),
            });
        }
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Self::from_connection(connection)
    }

    pub fn from_connection(connection: Connection) -> Result<Self> {
        for (table, columns) in REQUIRED_TABLES {
            if !table_exists(&connection, table)? || !table_has_columns(&connection, table, columns)? {
                debug!(table, "graph store table missing or incomplete");
                return Err(Error::UnsupportedSchema);
            }
        }
        let (vertex_table, vertex_columns) = VERTEX_TABLE;
        let has_vertices = table_exists(&connection, vertex_table)?
            && table_has_columns(&connection, vertex_table, vertex_columns)?;
        Ok(Self {
            connection,
            has_vertices,
        })
    }

    fn load_vertices(&self) -> Result<HashMap<EdgeId, Vec<Point>>> {
        let mut vertices: HashMap<EdgeId, Vec<Point>> = HashMap::new();
        if !self.has_vertices {
            return Ok(vertices);
        }
        let mut stmt = self
            .connection
            .prepare("SELECT edge_id, x, y FROM edge_vertices ORDER BY edge_id, vertex_order")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, EdgeId>(0)?, Point::new(row.get(1)?, row.get(2)?)))
        })?;
        for row in rows {
            let (edge, point) = row?;
            vertices.entry(edge).or_default().push(point);
        }
        Ok(vertices)
    }
}

impl GraphStore for SqliteStore {
    fn nodes(&self) -> Result<Vec<Node>> {
        let mut stmt = self
            .connection
            .prepare("SELECT node_id, x, y, floor, name FROM nodes ORDER BY node_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Point::new(row.get(1)?, row.get(2)?),
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut nodes = Vec::new();
        for row in rows {
            let (id, position, floor, name) = row?;
            nodes.push(Node {
                id,
                position,
                floor: Floor::try_from(floor)?,
                name: name.filter(|name| !name.trim().is_empty()),
            });
        }
        Ok(nodes)
    }

    fn edges(&self) -> Result<Vec<Edge>> {
        let mut vertices = self.load_vertices()?;
        let mut stmt = self.connection.prepare(
            "SELECT edge_id, node_1_id, node_2_id, weight, edge_type, one_way FROM edges ORDER BY edge_id",
        )?;
        let rows = stmt.query_map([], row_to_edge)?;

        let mut edges = Vec::new();
        for row in rows {
            let (id, node_a, node_b, weight, tag, one_way) = row?;
            edges.push(Edge {
                id,
                node_a,
                node_b,
                weight,
                edge_type: tag.parse()?,
                one_way,
                vertices: vertices.remove(&id).unwrap_or_default(),
            });
        }
        if !vertices.is_empty() {
            warn!(edges = vertices.len(), "ignored vertices for unknown edges");
        }
        Ok(edges)
    }

    fn rooms(&self) -> Result<Vec<Room>> {
        let mut stmt = self.connection.prepare(
            "SELECT room_id, room_name, node_id, edge_id, x, y, door_angle FROM rooms ORDER BY room_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RoomRow {
                id: row.get(0)?,
                name: row.get(1)?,
                node: row.get(2)?,
                edge: row.get(3)?,
                x: row.get(4)?,
                y: row.get(5)?,
                angle: row.get(6)?,
            })
        })?;

        let mut rooms = Vec::new();
        for row in rows {
            rooms.push(row?.into_room()?);
        }
        Ok(rooms)
    }

    fn velocities(&self) -> Result<VelocityTable> {
        let mut stmt = self
            .connection
            .prepare("SELECT edge_type, normal_velocity, congestion_velocity FROM edge_types")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut table = VelocityTable::new();
        for row in rows {
            let (tag, normal, congested) = row?;
            table.insert(tag.parse::<EdgeType>()?, Velocity { normal, congested });
        }
        Ok(table)
    }

    fn settings(&self) -> Result<StoreSettings> {
        let mut stmt = self
            .connection
            .prepare("SELECT setting_name, setting_value FROM settings ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = StoreSettings::default();
        for row in rows {
            let (name, value) = row?;
            match name.as_str() {
                name if name.starts_with("congestion_time") => settings
                    .congestion
                    .windows
                    .push(parse_time_of_day(name, &value)?),
                "congestion_duration" => settings.congestion.margin = parse_duration(&name, &value)?,
                "congestion_estimation_enabled" => {
                    settings.congestion_estimation_enabled = parse_flag(&name, &value)?
                }
                "always_passable_nodes" => {
                    settings.always_passable_nodes = parse_node_list(&name, &value)?
                }
                "gate_nodes" => settings.gate_nodes = parse_node_list(&name, &value)?,
                "beyond_boundary_nodes" => {
                    settings.beyond_boundary_nodes = parse_node_list(&name, &value)?
                }
                other => debug!(setting = other, "ignoring unrecognised setting"),
            }
        }
        Ok(settings)
    }
}

/// Load a complete graph snapshot from the SQLite database at `path`.
pub fn load_graph(path: &Path) -> Result<GraphSnapshot> {
    let store = SqliteStore::open(path)?;
    debug!(path = %path.display(), vertices = store.has_vertices, "loading graph store");
    GraphSnapshot::from_store(&store)
}

type EdgeRow = (EdgeId, i64, i64, f64, String, bool);

fn row_to_edge(row: &Row<'_>) -> rusqlite::Result<EdgeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get::<_, i64>(5)? != 0,
    ))
}

struct RoomRow {
    id: String,
    name: Option<String>,
    node: Option<i64>,
    edge: Option<EdgeId>,
    x: Option<f64>,
    y: Option<f64>,
    angle: Option<f64>,
}

impl RoomRow {
    fn into_room(self) -> Result<Room> {
        let door = match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        };
        let attachment = match (self.node, self.edge) {
            (Some(node), None) => RoomAttachment::Node { node, door },
            (None, Some(edge)) => match (door, self.angle) {
                (Some(door), Some(connector_angle)) => RoomAttachment::Edge {
                    edge,
                    door,
                    connector_angle,
                },
                _ => return Err(Error::InvalidRoomAttachment { id: self.id }),
            },
            _ => return Err(Error::InvalidRoomAttachment { id: self.id }),
        };
        Ok(Room {
            id: self.id,
            name: self.name.filter(|name| !name.trim().is_empty()),
            attachment,
        })
    }
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_has_columns(connection: &Connection, table: &str, required: &[&str]) -> Result<bool> {
    let mut stmt = connection.prepare(&format!("PRAGMA table_info('{table}')"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(required
        .iter()
        .all(|required| columns.iter().any(|column| column.eq_ignore_ascii_case(required))))
}
