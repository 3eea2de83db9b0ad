//! gridpath-core: grid model and BFS traversal engine.
//!
//! A pure Rust library that holds a fixed-size grid of walls and endpoints
//! and computes a deterministic event trace of a breadth-first search
//! across it: every discovery in order, then the shortest path from End
//! back to Start. No async runtime and no timing; pacing the trace for
//! display is left to the caller.

mod error;
mod grid;
mod traversal;

pub use error::{Error, Result};
pub use grid::{CellKind, Direction, GridModel, Position};
pub use traversal::{Outcome, TraversalEngine, TraversalEvent, TraversalResult};
