use tracing::debug;

use crate::error::RouteError;
use crate::geometry::round_to;
use crate::graph::EdgeType;
use crate::matrix::{Matrix, NodeIndex};

/// Shortest travel time from `start` to every node.
///
/// Unreachable nodes are reported as `f64::INFINITY`. Every relaxation is
/// rounded to one decimal place so distances line up with the rounded matrix
/// cells during [`backtrack`]. When several unvisited nodes share the smallest
/// tentative distance the lowest index is settled first.
pub fn dijkstra(matrix: &Matrix<f64>, start: usize) -> Vec<f64> {
    let size = matrix.size();
    let mut distances = vec![f64::INFINITY; size];
    let mut visited = vec![false; size];
    distances[start] = 0.0;

    loop {
        let mut current = None;
        let mut best = f64::INFINITY;
        for (index, distance) in distances.iter().enumerate() {
            if !visited[index] && *distance < best {
                best = *distance;
                current = Some(index);
            }
        }
        let Some(current) = current else {
            break;
        };
        visited[current] = true;

        for next in 0..size {
            if visited[next] {
                continue;
            }
            if let Some(time) = matrix.get(current, next) {
                let candidate = round_to(distances[current] + time, 1);
                if candidate < distances[next] {
                    distances[next] = candidate;
                }
            }
        }
    }

    distances
}

/// Rebuild the node path from `start` to `target` out of [`dijkstra`] output.
///
/// Walks backwards from the target, taking the first predecessor whose
/// distance plus the connecting edge time equals the current distance.
/// Predecessors with a strictly smaller distance are tried before those
/// joined by a zero-time edge, and a branch that dead-ends is abandoned for
/// the next candidate.
pub fn backtrack(
    matrix: &Matrix<f64>,
    nodes: &NodeIndex,
    distances: &[f64],
    start: usize,
    target: usize,
) -> Result<Vec<usize>, RouteError> {
    if !distances[target].is_finite() {
        return Err(RouteError::TargetUnreachable {
            location: format!("node {}", nodes.id_at(target)),
        });
    }

    let mut path = vec![target];
    // Untried predecessors for each node on `path`, stored in reverse so the
    // preferred candidate pops first.
    let mut pending = vec![predecessors(matrix, nodes, distances, &path, target)];
    let mut dead_end = None;

    while let Some(&current) = path.last() {
        if current == start {
            path.reverse();
            return Ok(path);
        }
        match pending.last_mut().and_then(Vec::pop) {
            Some(previous) => {
                path.push(previous);
                pending.push(predecessors(matrix, nodes, distances, &path, previous));
            }
            None => {
                if dead_end.is_none() {
                    dead_end = Some(current);
                }
                path.pop();
                pending.pop();
            }
        }
    }

    Err(RouteError::InconsistentPathState {
        node: nodes.id_at(dead_end.unwrap_or(target)),
    })
}

fn predecessors(
    matrix: &Matrix<f64>,
    nodes: &NodeIndex,
    distances: &[f64],
    path: &[usize],
    current: usize,
) -> Vec<usize> {
    let (mut closer, mut level): (Vec<usize>, Vec<usize>) = (0..matrix.size())
        .filter(|&previous| {
            if path.contains(&previous) || !distances[previous].is_finite() {
                return false;
            }
            match matrix.get(previous, current) {
                Some(time) => round_to(distances[current] - time, 1) == distances[previous],
                None => false,
            }
        })
        .partition(|&previous| distances[previous] < distances[current]);

    if closer.len() > 1 {
        let tied: Vec<_> = closer.iter().map(|&idx| nodes.id_at(idx)).collect();
        debug!(node = nodes.id_at(current), ?tied, "equal-cost predecessors; taking the first");
    }
    closer.append(&mut level);
    closer.reverse();
    closer
}

/// Walking distance along `path`, rounded to one decimal place.
///
/// Lift edges contribute no walking distance.
pub fn path_distance(
    distance: &Matrix<f64>,
    info: &Matrix<EdgeType>,
    nodes: &NodeIndex,
    path: &[usize],
) -> Result<f64, RouteError> {
    let mut total = 0.0;
    for pair in path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if info.get(from, to) == Some(EdgeType::Lift) {
            continue;
        }
        let metres = distance
            .get(from, to)
            .ok_or(RouteError::InconsistentPathState {
                node: nodes.id_at(to),
            })?;
        total += metres;
    }
    Ok(round_to(total, 1))
}
