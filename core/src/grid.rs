use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A cell coordinate. Rows grow downward, columns grow rightward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Neighbor one step in `dir`, or None if it would fall off the grid.
    pub fn step(self, dir: Direction, rows: usize, cols: usize) -> Option<Position> {
        let (row, col) = match dir {
            Direction::Down => (self.row.checked_add(1)?, self.col),
            Direction::Up => (self.row.checked_sub(1)?, self.col),
            Direction::Right => (self.row, self.col.checked_add(1)?),
            Direction::Left => (self.row, self.col.checked_sub(1)?),
        };
        (row < rows && col < cols).then_some(Position { row, col })
    }

    /// Manhattan distance in edges.
    pub fn manhattan(self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// One of the four orthogonal moves. No diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
    Right,
    Left,
}

impl Direction {
    /// Neighbor expansion order used by the traversal engine. Changing it
    /// changes every recorded trace.
    pub const SEARCH_ORDER: [Direction; 4] =
        [Direction::Down, Direction::Up, Direction::Right, Direction::Left];
}

/// Classification of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Wall,
    Start,
    End,
}

/// Fixed-size grid of cells with at most one Start and at most one End.
///
/// Walls are stored densely in row-major order; endpoints are stored as
/// positions so uniqueness holds by construction. Start and End may share
/// a cell, in which case `kind_at` reports `Start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridModel {
    rows: usize,
    cols: usize,
    walls: Vec<bool>,
    start: Option<Position>,
    end: Option<Position>,
}

impl GridModel {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            walls: vec![false; rows * cols],
            start: None,
            end: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Row-major cell index. Callers must have checked bounds.
    pub(crate) fn index(&self, pos: Position) -> usize {
        pos.row * self.cols + pos.col
    }

    fn check(&self, pos: Position) -> Result<usize> {
        if self.contains(pos) {
            Ok(self.index(pos))
        } else {
            Err(Error::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub fn start(&self) -> Option<Position> {
        self.start
    }

    pub fn end(&self) -> Option<Position> {
        self.end
    }

    pub fn is_start(&self, pos: Position) -> bool {
        self.start == Some(pos)
    }

    pub fn is_end(&self, pos: Position) -> bool {
        self.end == Some(pos)
    }

    /// Toggle the wall at `pos`. Endpoint cells are left untouched.
    pub fn toggle_wall(&mut self, pos: Position) -> Result<()> {
        let idx = self.check(pos)?;
        if self.is_start(pos) || self.is_end(pos) {
            return Ok(());
        }
        self.walls[idx] = !self.walls[idx];
        Ok(())
    }

    /// Move Start to `pos`, clearing any wall there.
    pub fn set_start(&mut self, pos: Position) -> Result<()> {
        let idx = self.check(pos)?;
        self.walls[idx] = false;
        self.start = Some(pos);
        Ok(())
    }

    /// Move End to `pos`, clearing any wall there.
    pub fn set_end(&mut self, pos: Position) -> Result<()> {
        let idx = self.check(pos)?;
        self.walls[idx] = false;
        self.end = Some(pos);
        Ok(())
    }

    /// Every cell back to Empty; endpoints forgotten.
    pub fn reset(&mut self) {
        self.walls.fill(false);
        self.start = None;
        self.end = None;
    }

    /// In bounds and not a wall.
    pub fn is_passable(&self, pos: Position) -> bool {
        self.contains(pos) && !self.walls[self.index(pos)]
    }

    pub fn kind_at(&self, pos: Position) -> Result<CellKind> {
        let idx = self.check(pos)?;
        Ok(if self.is_start(pos) {
            CellKind::Start
        } else if self.is_end(pos) {
            CellKind::End
        } else if self.walls[idx] {
            CellKind::Wall
        } else {
            CellKind::Empty
        })
    }

    pub fn wall_count(&self) -> usize {
        self.walls.iter().filter(|&&w| w).count()
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position { row, col }))
    }
}
