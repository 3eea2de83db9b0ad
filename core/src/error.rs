use thiserror::Error;

use crate::grid::Position;

/// Errors raised by the grid model and the traversal engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A position outside the grid extents. Well-formed callers never
    /// produce this; treat it as a programming error.
    #[error("position {pos} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        pos: Position,
        rows: usize,
        cols: usize,
    },

    /// A run was requested before both endpoints were placed.
    #[error("Set Start and End nodes! (start set: {start_set}, end set: {end_set})")]
    MissingEndpoints { start_set: bool, end_set: bool },
}

/// Result type alias for grid and traversal operations.
pub type Result<T> = std::result::Result<T, Error>;
