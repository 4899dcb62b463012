use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::NaiveTime;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geometry::{round_to, validate_room_geometry};
use crate::graph::{EdgeType, GraphSnapshot, NodeId};
use crate::settings::RoutingSettings;

/// Dense index space over the node ids of one graph snapshot.
///
/// Indices follow ascending node id order and never change for the lifetime
/// of the bundle that owns them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeIndex {
    ids: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl NodeIndex {
    pub fn from_graph(graph: &GraphSnapshot) -> Self {
        let ids: Vec<NodeId> = graph.nodes().map(|node| node.id).collect();
        let positions = ids.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
        Self { ids, positions }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Node id stored at `index`. Panics on an index outside the space.
    pub fn id_at(&self, index: usize) -> NodeId {
        self.ids[index]
    }

    pub fn require(&self, id: NodeId) -> Result<usize> {
        self.index_of(id).ok_or(Error::UnknownNode { id })
    }
}

/// Square matrix whose cells are `None` where no edge exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    size: usize,
    cells: Vec<Option<T>>,
}

impl<T: Copy> Matrix<T> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> Option<T> {
        self.cells[from * self.size + to]
    }

    pub fn has_edge(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_some()
    }

    pub fn set(&mut self, from: usize, to: usize, value: T) {
        self.cells[from * self.size + to] = Some(value);
    }

    pub fn clear(&mut self, from: usize, to: usize) {
        self.cells[from * self.size + to] = None;
    }

    /// Remove every edge into or out of `index`.
    pub fn isolate(&mut self, index: usize) {
        for other in 0..self.size {
            self.clear(index, other);
            self.clear(other, index);
        }
    }

    /// Whether any edge leaves `from`.
    pub fn has_outgoing(&self, from: usize) -> bool {
        (0..self.size).any(|to| self.has_edge(from, to))
    }

    /// Apply `f` to every present cell, keeping the ones it maps to `Some`.
    fn filter_map<U: Copy>(&self, mut f: impl FnMut(usize, usize, T) -> Option<U>) -> Matrix<U> {
        let mut out = Matrix::new(self.size);
        for from in 0..self.size {
            for to in 0..self.size {
                if let Some(value) = self.get(from, to) {
                    if let Some(mapped) = f(from, to, value) {
                        out.set(from, to, mapped);
                    }
                }
            }
        }
        out
    }
}

/// Immutable set of matrices for one graph, settings and congestion state.
#[derive(Debug, Clone)]
pub struct MatrixBundle {
    nodes: NodeIndex,
    distance_default: Matrix<f64>,
    distance_one_way: Matrix<f64>,
    info_default: Matrix<EdgeType>,
    info_one_way: Matrix<EdgeType>,
    time_accessible: Matrix<f64>,
    time_standard: Matrix<f64>,
    settings: RoutingSettings,
    congested: bool,
}

impl MatrixBundle {
    pub fn nodes(&self) -> &NodeIndex {
        &self.nodes
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Whether congested velocities were used for the time matrices.
    pub fn congested(&self) -> bool {
        self.congested
    }

    pub fn distance_default(&self) -> &Matrix<f64> {
        &self.distance_default
    }

    pub fn distance_one_way(&self) -> &Matrix<f64> {
        &self.distance_one_way
    }

    pub fn info_default(&self) -> &Matrix<EdgeType> {
        &self.info_default
    }

    pub fn info_one_way(&self) -> &Matrix<EdgeType> {
        &self.info_one_way
    }

    /// Step-free time matrix: stairs removed, one-way restrictions ignored.
    pub fn time_accessible(&self) -> &Matrix<f64> {
        &self.time_accessible
    }

    /// Standard time matrix: lifts removed, one-way restrictions applied when
    /// the one-way system is on.
    pub fn time_standard(&self) -> &Matrix<f64> {
        &self.time_standard
    }

    /// Time matrix for the access mode the bundle was built with.
    pub fn time_matrix(&self) -> &Matrix<f64> {
        if self.settings.access.step_free {
            &self.time_accessible
        } else {
            &self.time_standard
        }
    }

    pub fn distance_matrix(&self) -> &Matrix<f64> {
        if self.settings.access.honours_one_way() {
            &self.distance_one_way
        } else {
            &self.distance_default
        }
    }

    pub fn info_matrix(&self) -> &Matrix<EdgeType> {
        if self.settings.access.honours_one_way() {
            &self.info_one_way
        } else {
            &self.info_default
        }
    }
}

/// Build every matrix for `graph`.
///
/// Weights are rounded to one decimal place. Edges whose endpoints are not in
/// the graph are skipped with a warning. Non-positive weights and missing or
/// invalid velocities abort the build, as does a room whose connector cannot
/// meet its edge.
pub fn build_matrices(
    graph: &GraphSnapshot,
    settings: &RoutingSettings,
    congested: bool,
) -> Result<MatrixBundle> {
    let started = Instant::now();
    validate_room_geometry(graph)?;
    let nodes = NodeIndex::from_graph(graph);
    let size = nodes.len();

    let mut distance_default = Matrix::new(size);
    let mut info_default = Matrix::new(size);
    let mut one_way_reverse = Vec::new();
    let mut edge_count = 0usize;

    for edge in graph.edges() {
        let (Some(a), Some(b)) = (nodes.index_of(edge.node_a), nodes.index_of(edge.node_b)) else {
            warn!(edge = edge.id, "skipping edge with unknown endpoint");
            continue;
        };
        let weight = round_to(edge.weight, 1);
        if !weight.is_finite() || weight <= 0.0 {
            return Err(Error::InvalidEdgeWeight {
                edge: edge.id,
                weight: edge.weight,
            });
        }

        distance_default.set(a, b, weight);
        distance_default.set(b, a, weight);
        info_default.set(a, b, edge.edge_type);
        info_default.set(b, a, edge.edge_type);
        if edge.one_way {
            one_way_reverse.push((b, a));
        }
        edge_count += 1;
    }

    let mut distance_one_way = distance_default.clone();
    let mut info_one_way = info_default.clone();
    for (from, to) in one_way_reverse {
        distance_one_way.clear(from, to);
        info_one_way.clear(from, to);
    }

    let velocities = graph.velocities();
    let to_time = |distance: &Matrix<f64>, info: &Matrix<EdgeType>| -> Result<Matrix<f64>> {
        let mut time = Matrix::new(size);
        for from in 0..size {
            for to in 0..size {
                if let (Some(metres), Some(kind)) = (distance.get(from, to), info.get(from, to)) {
                    let velocity = velocities.get(kind, congested)?;
                    time.set(from, to, round_to(metres / velocity, 1));
                }
            }
        }
        Ok(time)
    };

    let time_default = to_time(&distance_default, &info_default)?;
    let (standard_base, standard_info) = if settings.access.honours_one_way() {
        (to_time(&distance_one_way, &info_one_way)?, &info_one_way)
    } else {
        (time_default.clone(), &info_default)
    };

    let time_standard = standard_base.filter_map(|from, to, time| {
        (standard_info.get(from, to) != Some(EdgeType::Lift)).then_some(time)
    });

    let passable = &graph.settings().always_passable_nodes;
    let time_accessible = time_default.filter_map(|from, to, time| {
        let stairs = info_default.get(from, to) == Some(EdgeType::Stairs);
        let allowed = passable.contains(&nodes.id_at(from)) || passable.contains(&nodes.id_at(to));
        (!stairs || allowed).then_some(time)
    });

    info!(
        nodes = size,
        edges = edge_count,
        congested,
        step_free = settings.access.step_free,
        one_way = settings.access.honours_one_way(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built routing matrices"
    );

    Ok(MatrixBundle {
        nodes,
        distance_default,
        distance_one_way,
        info_default,
        info_one_way,
        time_accessible,
        time_standard,
        settings: *settings,
        congested,
    })
}

/// Build matrices using the congestion state at time of day `at`.
pub fn build_matrices_at(
    graph: &GraphSnapshot,
    settings: &RoutingSettings,
    at: NaiveTime,
) -> Result<MatrixBundle> {
    let congested = settings.congestion_active(graph.settings(), at);
    build_matrices(graph, settings, congested)
}

/// Shared, swappable matrix bundle.
///
/// Queries clone the current `Arc` and keep using it even if a rebuild swaps
/// in a new bundle meanwhile. A failed rebuild leaves the previous bundle in
/// place.
#[derive(Debug)]
pub struct MatrixCache {
    graph: Arc<GraphSnapshot>,
    current: RwLock<Arc<MatrixBundle>>,
}

impl MatrixCache {
    pub fn build(graph: Arc<GraphSnapshot>, settings: RoutingSettings, at: NaiveTime) -> Result<Self> {
        let bundle = build_matrices_at(&graph, &settings, at)?;
        Ok(Self {
            graph,
            current: RwLock::new(Arc::new(bundle)),
        })
    }

    pub fn graph(&self) -> &Arc<GraphSnapshot> {
        &self.graph
    }

    pub fn current(&self) -> Arc<MatrixBundle> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build a fresh bundle and swap it in.
    pub fn rebuild(&self, settings: RoutingSettings, at: NaiveTime) -> Result<Arc<MatrixBundle>> {
        let bundle = Arc::new(build_matrices_at(&self.graph, &settings, at)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&bundle);
        Ok(bundle)
    }

    /// Rebuild when the congestion state at `now` differs from the current
    /// bundle's. Returns whether a rebuild happened.
    pub fn refresh_if_stale(&self, now: NaiveTime) -> Result<bool> {
        let current = self.current();
        let settings = *current.settings();
        if settings.congestion_active(self.graph.settings(), now) == current.congested() {
            return Ok(false);
        }
        debug!(congested = !current.congested(), "congestion state changed; rebuilding");
        self.rebuild(settings, now)?;
        Ok(true)
    }
}

/// Estimated walking time in seconds for `distance` metres along `edge_type`.
pub fn estimate_time(
    graph: &GraphSnapshot,
    distance: f64,
    edge_type: EdgeType,
    congested: bool,
) -> Result<f64> {
    Ok(round_to(distance / graph.velocities().get(edge_type, congested)?, 1))
}
