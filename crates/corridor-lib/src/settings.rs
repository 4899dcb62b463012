use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveTime, TimeDelta, Timelike};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{EdgeType, NodeId};

/// Walking speed along an edge type in metres per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Velocity {
    pub normal: f64,
    pub congested: f64,
}

/// Per-edge-type velocities, validated on lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityTable {
    entries: BTreeMap<EdgeType, Velocity>,
}

impl VelocityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by stores and tests.
    pub fn with(mut self, edge_type: EdgeType, normal: f64, congested: f64) -> Self {
        self.insert(edge_type, Velocity { normal, congested });
        self
    }

    pub fn insert(&mut self, edge_type: EdgeType, velocity: Velocity) {
        self.entries.insert(edge_type, velocity);
    }

    /// Velocity to use for `edge_type`, failing closed when it is missing or
    /// would yield an infinite or negative time.
    pub fn get(&self, edge_type: EdgeType, congested: bool) -> Result<f64> {
        let velocity = self
            .entries
            .get(&edge_type)
            .ok_or(Error::MissingVelocity { edge_type })?;
        let value = if congested {
            velocity.congested
        } else {
            velocity.normal
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidVelocity { edge_type, value });
        }
        Ok(value)
    }
}

/// Time-of-day windows during which congested velocities apply.
#[derive(Debug, Clone, PartialEq)]
pub struct CongestionSchedule {
    pub windows: Vec<NaiveTime>,
    pub margin: TimeDelta,
}

impl Default for CongestionSchedule {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            margin: TimeDelta::zero(),
        }
    }
}

impl CongestionSchedule {
    /// True when `at` lies within `[window, window + margin]` for any window.
    /// Both ends are inclusive. A window whose end passes midnight stays
    /// active until the end of the day and does not resume after midnight.
    pub fn is_congested(&self, at: NaiveTime) -> bool {
        self.windows.iter().any(|start| {
            if at < *start {
                return false;
            }
            let (end, wrapped) = start.overflowing_add_signed(self.margin);
            wrapped != 0 || at <= end
        })
    }
}

/// Settings read from the graph store's `settings` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSettings {
    pub congestion: CongestionSchedule,
    pub congestion_estimation_enabled: bool,
    /// Nodes whose stairs stay usable in step-free mode.
    pub always_passable_nodes: BTreeSet<NodeId>,
    /// Nodes removed from routing unless an endpoint is at the boundary.
    pub gate_nodes: BTreeSet<NodeId>,
    pub beyond_boundary_nodes: BTreeSet<NodeId>,
}

impl StoreSettings {
    /// Whether a bare node endpoint keeps the gate nodes in play.
    pub fn is_boundary_node(&self, node: NodeId) -> bool {
        self.gate_nodes.contains(&node) || self.beyond_boundary_nodes.contains(&node)
    }
}

/// User-selected access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessMode {
    pub one_way_system: bool,
    pub step_free: bool,
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::standard()
    }
}

impl AccessMode {
    /// Step-free access switches the one-way system off.
    pub fn new(one_way_system: bool, step_free: bool) -> Self {
        Self {
            one_way_system: one_way_system && !step_free,
            step_free,
        }
    }

    pub fn standard() -> Self {
        Self::new(true, false)
    }

    pub fn step_free() -> Self {
        Self::new(false, true)
    }

    pub fn honours_one_way(&self) -> bool {
        self.one_way_system && !self.step_free
    }
}

/// Everything a matrix build depends on besides the graph itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingSettings {
    pub access: AccessMode,
    /// User-level congestion toggle; combined with the store flag.
    pub use_congestion: bool,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            access: AccessMode::standard(),
            use_congestion: true,
        }
    }
}

impl RoutingSettings {
    pub fn congestion_active(&self, store: &StoreSettings, at: NaiveTime) -> bool {
        self.use_congestion && store.congestion_estimation_enabled && store.congestion.is_congested(at)
    }
}

/// Parse an `HH:MM:SS` (or `HH:MM`) time of day.
pub fn parse_time_of_day(name: &str, value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|err| Error::InvalidSetting {
            name: name.to_string(),
            message: format!("'{value}' is not a time of day: {err}"),
        })
}

/// Parse an `HH:MM:SS` span into a duration.
pub fn parse_duration(name: &str, value: &str) -> Result<TimeDelta> {
    let time = parse_time_of_day(name, value)?;
    Ok(TimeDelta::seconds(i64::from(time.num_seconds_from_midnight())))
}

/// Parse a comma separated list of node ids. Blank input yields an empty set.
pub fn parse_node_list(name: &str, value: &str) -> Result<BTreeSet<NodeId>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<NodeId>().map_err(|err| Error::InvalidSetting {
                name: name.to_string(),
                message: format!("'{part}' is not a node id: {err}"),
            })
        })
        .collect()
}

/// Parse a `0`/`1`/`true`/`false` flag.
pub fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(Error::InvalidSetting {
            name: name.to_string(),
            message: format!("'{other}' is not a flag"),
        }),
    }
}
