use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connections::find_connections;
use crate::symbols::{Level, Symbol};

/// Retries a derived generator makes before falling back to forced
/// construction.
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Cell coordinate. `y = 0` is the top row; symbols fall toward larger `y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Square symbol grid stored row-major (`rows[y][x]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Symbol>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Symbol>>) -> Self {
        Self { rows }
    }

    pub fn filled(size: usize, symbol: Symbol) -> Self {
        Self {
            rows: vec![vec![symbol; size]; size],
        }
    }

    pub fn rows(&self) -> &[Vec<Symbol>] {
        &self.rows
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.y < self.rows.len() && pos.x < self.rows[pos.y].len()
    }

    pub fn get(&self, pos: Position) -> Option<Symbol> {
        self.rows.get(pos.y).and_then(|row| row.get(pos.x)).copied()
    }

    /// Overwrites one cell. Out-of-bounds positions are ignored.
    pub fn set(&mut self, pos: Position, symbol: Symbol) {
        if let Some(cell) = self.rows.get_mut(pos.y).and_then(|row| row.get_mut(pos.x)) {
            *cell = symbol;
        }
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| (0..row.len()).map(move |x| Position::new(x, y)))
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|s| **s == symbol)
            .count()
    }

    pub fn has_trigger(&self) -> bool {
        self.count(Symbol::FreeGame) > 0
    }

    /// True when the grid is square with the side length `level` requires.
    pub fn matches_level(&self, level: Level) -> bool {
        let size = level.grid_size();
        self.rows.len() == size && self.rows.iter().all(|row| row.len() == size)
    }
}

/// Fresh `size x size` grid of independent weighted draws. The trigger
/// symbol leaves the pool once placed, and never enters it when
/// `forbid_trigger` is set.
pub fn generate<R: Rng + ?Sized>(level: Level, forbid_trigger: bool, rng: &mut R) -> Grid {
    let size = level.grid_size();
    let table = level.weights();
    let mut trigger_placed = false;
    let mut rows = Vec::with_capacity(size);
    for _ in 0..size {
        let mut row = Vec::with_capacity(size);
        for _ in 0..size {
            let symbol = table.draw(rng, forbid_trigger || trigger_placed);
            trigger_placed |= symbol.is_trigger();
            row.push(symbol);
        }
        rows.push(row);
    }
    Grid { rows }
}

/// Plain generation retried until a regular connection exists, falling back
/// to [`force_connection`].
pub fn generate_with_connection<R: Rng + ?Sized>(
    level: Level,
    forbid_trigger: bool,
    rng: &mut R,
) -> Grid {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let grid = generate(level, forbid_trigger, rng);
        if !find_connections(&grid, level).is_empty() {
            return grid;
        }
    }
    debug!(level = %level, "no natural connection, forcing one");
    force_connection(level, forbid_trigger, rng)
}

/// Plain generation retried until no regular connection exists, falling
/// back to [`force_no_connection`].
pub fn generate_without_connection<R: Rng + ?Sized>(
    level: Level,
    forbid_trigger: bool,
    rng: &mut R,
) -> Grid {
    for _ in 0..MAX_GENERATION_ATTEMPTS {
        let grid = generate(level, forbid_trigger, rng);
        if find_connections(&grid, level).is_empty() {
            return grid;
        }
    }
    warn!(level = %level, "no natural loss grid, forcing one");
    force_no_connection(level, forbid_trigger, rng)
}

/// Fresh grid with a horizontal run of exactly `min_connection` copies of a
/// random bird written at a random row and offset.
pub fn force_connection<R: Rng + ?Sized>(level: Level, forbid_trigger: bool, rng: &mut R) -> Grid {
    let mut grid = generate(level, forbid_trigger, rng);
    let size = level.grid_size();
    let run = level.min_connection();
    let symbol = *Symbol::BIRDS.choose(rng).unwrap_or(&Symbol::PurpleOwl);
    let start = rng.gen_range(0..=size - run);
    let y = rng.gen_range(0..size);
    for x in start..start + run {
        grid.set(Position::new(x, y), symbol);
    }
    grid
}

/// Cell-by-cell construction that never repeats a bird from the left or top
/// neighbour. Longer adjacency paths are not guarded, so the result is
/// best-effort rather than guaranteed connection-free.
pub fn force_no_connection<R: Rng + ?Sized>(
    level: Level,
    forbid_trigger: bool,
    rng: &mut R,
) -> Grid {
    let size = level.grid_size();
    let table = level.weights();
    let mut trigger_placed = false;
    let mut rows: Vec<Vec<Symbol>> = Vec::with_capacity(size);
    for y in 0..size {
        let mut row: Vec<Symbol> = Vec::with_capacity(size);
        for x in 0..size {
            let left = if x > 0 { Some(row[x - 1]) } else { None };
            let up = if y > 0 { Some(rows[y - 1][x]) } else { None };
            let blocked = |s: Symbol| s.is_regular() && (Some(s) == left || Some(s) == up);
            let symbol = table.draw_where(rng, |s| {
                !blocked(s) && !(s.is_trigger() && (forbid_trigger || trigger_placed))
            });
            trigger_placed |= symbol.is_trigger();
            row.push(symbol);
        }
        rows.push(row);
    }
    Grid { rows }
}
