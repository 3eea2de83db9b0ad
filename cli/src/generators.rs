//! Grid generators. All deterministic for a given seed, O(rows * cols).

use clap::ValueEnum;
use gridpath_core::{Direction, GridModel, Position, Result};

/// Simple LCG for deterministic, fast pseudo-random numbers.
pub struct FastRng(u64);

impl FastRng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }

    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    /// No walls, corner to corner
    Open,
    /// Uniform random walls (30% density)
    Scatter,
    /// Randomised depth-first carve, one route between any two rooms
    Maze,
    /// Two rooms joined by a single door
    Barbell,
    /// End sealed off by walls
    Enclosed,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 5] = [
        GeneratorKind::Open,
        GeneratorKind::Scatter,
        GeneratorKind::Maze,
        GeneratorKind::Barbell,
        GeneratorKind::Enclosed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Open => "open field",
            GeneratorKind::Scatter => "scattered walls",
            GeneratorKind::Maze => "maze (dfs carve)",
            GeneratorKind::Barbell => "barbell (room-door-room)",
            GeneratorKind::Enclosed => "enclosed end",
        }
    }

    pub fn generate(self, rows: usize, cols: usize, seed: u64) -> Result<GridModel> {
        match self {
            GeneratorKind::Open => gen_open(rows, cols),
            GeneratorKind::Scatter => gen_scatter(rows, cols, seed),
            GeneratorKind::Maze => gen_maze(rows, cols, seed),
            GeneratorKind::Barbell => gen_barbell(rows, cols),
            GeneratorKind::Enclosed => gen_enclosed(rows, cols),
        }
    }
}

fn corner_to_corner(grid: &mut GridModel) -> Result<()> {
    let (rows, cols) = (grid.rows(), grid.cols());
    grid.set_start(Position::new(0, 0))?;
    grid.set_end(Position::new(rows.saturating_sub(1), cols.saturating_sub(1)))
}

fn gen_open(rows: usize, cols: usize) -> Result<GridModel> {
    let mut grid = GridModel::new(rows, cols);
    corner_to_corner(&mut grid)?;
    Ok(grid)
}

/// Each cell is a wall with probability 0.3. Endpoints are placed last,
/// which clears any wall under them.
fn gen_scatter(rows: usize, cols: usize, seed: u64) -> Result<GridModel> {
    let mut grid = GridModel::new(rows, cols);
    let mut rng = FastRng::new(seed);
    for row in 0..rows {
        for col in 0..cols {
            if rng.next_f64() < 0.3 {
                grid.toggle_wall(Position::new(row, col))?;
            }
        }
    }
    corner_to_corner(&mut grid)?;
    Ok(grid)
}

/// Rooms sit on even coordinates; walls between them are knocked out by a
/// randomised depth-first walk. Every room is reachable by exactly one route.
fn gen_maze(rows: usize, cols: usize, seed: u64) -> Result<GridModel> {
    let mut grid = GridModel::new(rows, cols);
    let mut rng = FastRng::new(seed);
    let idx = |pos: Position| pos.row * cols + pos.col;

    let mut open = vec![false; rows * cols];
    let mut stack = Vec::new();
    if rows > 0 && cols > 0 {
        open[0] = true;
        stack.push(Position::new(0, 0));
    }

    let mut options = Vec::with_capacity(4);
    while let Some(&cell) = stack.last() {
        options.clear();
        for dir in Direction::SEARCH_ORDER {
            let Some(between) = cell.step(dir, rows, cols) else {
                continue;
            };
            let Some(next) = between.step(dir, rows, cols) else {
                continue;
            };
            if !open[idx(next)] {
                options.push((between, next));
            }
        }
        if options.is_empty() {
            stack.pop();
            continue;
        }
        let (between, next) = options[rng.next(options.len() as u64) as usize];
        open[idx(between)] = true;
        open[idx(next)] = true;
        stack.push(next);
    }

    for row in 0..rows {
        for col in 0..cols {
            let pos = Position::new(row, col);
            if !open[idx(pos)] {
                grid.toggle_wall(pos)?;
            }
        }
    }

    // Last room on the even lattice
    let end_row = rows.saturating_sub(1) / 2 * 2;
    let end_col = cols.saturating_sub(1) / 2 * 2;
    grid.set_start(Position::new(0, 0))?;
    grid.set_end(Position::new(end_row, end_col))?;
    Ok(grid)
}

/// A full-height wall down the middle column with one door at mid-height.
/// Grids narrower than three columns get no wall.
fn gen_barbell(rows: usize, cols: usize) -> Result<GridModel> {
    let mut grid = GridModel::new(rows, cols);
    let door = rows / 2;
    if cols >= 3 {
        let wall_col = cols / 2;
        for row in (0..rows).filter(|&r| r != door) {
            grid.toggle_wall(Position::new(row, wall_col))?;
        }
    }
    grid.set_start(Position::new(door, 0))?;
    grid.set_end(Position::new(door, cols.saturating_sub(1)))?;
    Ok(grid)
}

/// End in the centre with all four neighbours walled. Sealed whenever the
/// grid is at least 2x2 and Start is not one of those neighbours.
fn gen_enclosed(rows: usize, cols: usize) -> Result<GridModel> {
    let mut grid = GridModel::new(rows, cols);
    let end = Position::new(rows / 2, cols / 2);
    for dir in Direction::SEARCH_ORDER {
        if let Some(pos) = end.step(dir, rows, cols) {
            grid.toggle_wall(pos)?;
        }
    }
    grid.set_start(Position::new(0, 0))?;
    grid.set_end(end)?;
    Ok(grid)
}
