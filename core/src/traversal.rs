use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::{Direction, GridModel, Position};

/// One entry of an event trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraversalEvent {
    /// `pos` was discovered (enqueued) from `parent`, its BFS parent.
    /// The start cell is never reported as a visit.
    Visit { pos: Position, parent: Position },
    /// `pos` lies on the shortest path. Emitted End first, Start last.
    PathStep { pos: Position },
}

impl TraversalEvent {
    pub fn pos(&self) -> Position {
        match *self {
            TraversalEvent::Visit { pos, .. } | TraversalEvent::PathStep { pos } => pos,
        }
    }
}

/// Terminal outcome of a completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PathFound,
    NoPathFound,
}

/// The full, replayable output of one BFS run.
///
/// All `Visit` events precede all `PathStep` events. On `NoPathFound` the
/// trace holds visits only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalResult {
    events: Vec<TraversalEvent>,
    outcome: Outcome,
    /// Cells marked visited, including Start.
    nodes_visited: usize,
}

impl TraversalResult {
    pub fn events(&self) -> &[TraversalEvent] {
        &self.events
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn nodes_visited(&self) -> usize {
        self.nodes_visited
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn visits(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.events.iter().filter_map(|e| match *e {
            TraversalEvent::Visit { pos, parent } => Some((pos, parent)),
            TraversalEvent::PathStep { .. } => None,
        })
    }

    /// Path cells in emission order (End first).
    pub fn path_steps(&self) -> impl Iterator<Item = Position> + '_ {
        self.events.iter().filter_map(|e| match *e {
            TraversalEvent::PathStep { pos } => Some(pos),
            TraversalEvent::Visit { .. } => None,
        })
    }

    /// Path cells from Start to End. Empty when no path was found.
    pub fn path(&self) -> Vec<Position> {
        let mut path: Vec<Position> = self.path_steps().collect();
        path.reverse();
        path
    }
}

/// Breadth-first search over the passable cells of a [`GridModel`].
///
/// Unit edge weights, 4-connectivity, neighbors expanded in
/// [`Direction::SEARCH_ORDER`]. The grid is only borrowed; the returned
/// trace has no tie back to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalEngine;

impl TraversalEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run BFS from Start to End and record the full event trace.
    ///
    /// Fails with `MissingEndpoints` before doing any work if either
    /// endpoint is unset.
    pub fn run(&self, grid: &GridModel) -> Result<TraversalResult> {
        let (start, end) = match (grid.start(), grid.end()) {
            (Some(s), Some(e)) => (s, e),
            (s, e) => {
                return Err(Error::MissingEndpoints {
                    start_set: s.is_some(),
                    end_set: e.is_some(),
                })
            }
        };

        let (rows, cols) = (grid.rows(), grid.cols());
        debug!(rows, cols, %start, %end, "bfs run starting");

        // Row-major index of each visited cell's parent; Start has none.
        let mut visited = vec![false; rows * cols];
        let mut parent = vec![NO_PARENT; rows * cols];
        let mut queue: VecDeque<Position> = VecDeque::new();
        let mut events = Vec::new();

        visited[grid.index(start)] = true;
        queue.push_back(start);
        let mut nodes_visited = 1;

        while let Some(current) = queue.pop_front() {
            if current == end {
                let path_start = events.len();
                reconstruct_path(grid, &parent, end, &mut events);
                debug!(
                    visits = path_start,
                    path_len = events.len() - path_start,
                    "bfs reached end"
                );
                return Ok(TraversalResult {
                    events,
                    outcome: Outcome::PathFound,
                    nodes_visited,
                });
            }

            for dir in Direction::SEARCH_ORDER {
                let Some(next) = current.step(dir, rows, cols) else {
                    continue;
                };
                let idx = grid.index(next);
                if visited[idx] || !grid.is_passable(next) {
                    continue;
                }
                visited[idx] = true;
                parent[idx] = grid.index(current);
                queue.push_back(next);
                nodes_visited += 1;
                events.push(TraversalEvent::Visit {
                    pos: next,
                    parent: current,
                });
            }
        }

        debug!(visits = events.len(), "bfs exhausted without reaching end");
        Ok(TraversalResult {
            events,
            outcome: Outcome::NoPathFound,
            nodes_visited,
        })
    }
}

const NO_PARENT: usize = usize::MAX;

/// Walk parent links from `end` back to the root, one `PathStep` per cell.
fn reconstruct_path(
    grid: &GridModel,
    parent: &[usize],
    end: Position,
    events: &mut Vec<TraversalEvent>,
) {
    let cols = grid.cols();
    let mut idx = grid.index(end);
    loop {
        events.push(TraversalEvent::PathStep {
            pos: Position::new(idx / cols, idx % cols),
        });
        idx = parent[idx];
        if idx == NO_PARENT {
            break;
        }
    }
}
