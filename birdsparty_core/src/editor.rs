//! Removal, gravity and refill.
//!
//! Removed cells are emptied, each targeted column is compacted toward the
//! bottom (a stable partition: survivors keep their relative order) and the
//! vacated top cells are refilled with fresh weighted draws. The refill
//! honours the one-trigger-per-grid cap across the whole grid.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::grid::{Grid, Position};
use crate::symbols::{Level, Symbol};

/// Which columns a removal pass visits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ColumnScope {
    /// Every column.
    Full,
    /// Only columns holding at least one removed cell; every other column
    /// is left bit-identical.
    Surgical,
}

impl ColumnScope {
    fn columns(self, size: usize, removed: &[Position]) -> BTreeSet<usize> {
        match self {
            ColumnScope::Full => (0..size).collect(),
            ColumnScope::Surgical => removed.iter().map(|p| p.x).filter(|x| *x < size).collect(),
        }
    }
}

/// Removes `removed` cells, applies gravity in the columns `scope` selects
/// and refills the gaps. Returns the positions that received new symbols,
/// which is the only surface later reconciliation may edit. Out-of-bounds
/// positions are ignored.
pub fn remove_and_refill<R: Rng + ?Sized>(
    grid: &mut Grid,
    removed: &[Position],
    level: Level,
    forbid_trigger: bool,
    scope: ColumnScope,
    rng: &mut R,
) -> Vec<Position> {
    let size = grid.size();
    let mut cells: Vec<Vec<Option<Symbol>>> = grid
        .rows()
        .iter()
        .map(|row| row.iter().copied().map(Some).collect())
        .collect();
    for pos in removed.iter().filter(|p| grid.contains(**p)) {
        cells[pos.y][pos.x] = None;
    }

    let columns = scope.columns(size, removed);
    let mut refilled = Vec::new();
    for &x in &columns {
        let gap = compact_column(&mut cells, x);
        if gap > 0 {
            debug!(column = x, vacated = gap, "column compacted");
        }
        refilled.extend((0..gap).map(|y| Position::new(x, y)));
    }

    let table = level.weights();
    for pos in &refilled {
        let trigger_live = cells
            .iter()
            .flatten()
            .any(|c| matches!(c, Some(s) if s.is_trigger()));
        let symbol = table.draw(rng, forbid_trigger || trigger_live);
        cells[pos.y][pos.x] = Some(symbol);
        debug!(x = pos.x, y = pos.y, %symbol, "refilled cell");
    }

    // Every emptied cell sits in a visited column and was refilled above.
    let rows: Vec<Vec<Symbol>> = cells
        .into_iter()
        .zip(grid.rows())
        .map(|(row, old)| {
            row.into_iter()
                .zip(old)
                .map(|(cell, prev)| cell.unwrap_or(*prev))
                .collect::<Vec<Symbol>>()
        })
        .collect();
    *grid = Grid::from_rows(rows);
    refilled
}

/// Moves the surviving cells of column `x` to the bottom, preserving their
/// order, and returns how many cells at the top are now empty.
fn compact_column(cells: &mut [Vec<Option<Symbol>>], x: usize) -> usize {
    let survivors: Vec<Symbol> = cells.iter().filter_map(|row| row[x]).collect();
    let gap = cells.len() - survivors.len();
    for (y, row) in cells.iter_mut().enumerate() {
        row[x] = if y < gap { None } else { Some(survivors[y - gap]) };
    }
    gap
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use Symbol::*;

    fn sample() -> Grid {
        Grid::from_rows(vec![
            vec![RedOwl, BlueOwl, GreenOwl, YellowOwl],
            vec![PurpleOwl, GreenOwl, BlueOwl, GreenOwl],
            vec![YellowOwl, RedOwl, OrangeSlice, BlueOwl],
            vec![GreenOwl, BlueOwl, GreenOwl, YellowOwl],
        ])
    }

    #[test]
    fn gravity_is_a_stable_partition() {
        let mut grid = sample();
        let mut rng = StdRng::seed_from_u64(1);
        let new = remove_and_refill(
            &mut grid,
            &[Position::new(0, 1), Position::new(0, 3)],
            Level::One,
            false,
            ColumnScope::Surgical,
            &mut rng,
        );
        assert_eq!(new, vec![Position::new(0, 0), Position::new(0, 1)]);
        assert_eq!(grid.get(Position::new(0, 2)), Some(RedOwl));
        assert_eq!(grid.get(Position::new(0, 3)), Some(YellowOwl));
    }

    #[test]
    fn surgical_scope_leaves_other_columns_untouched() {
        let before = sample();
        let mut grid = before.clone();
        let mut rng = StdRng::seed_from_u64(2);
        remove_and_refill(
            &mut grid,
            &[Position::new(2, 2)],
            Level::One,
            false,
            ColumnScope::Surgical,
            &mut rng,
        );
        for pos in before.positions().filter(|p| p.x != 2) {
            assert_eq!(grid.get(pos), before.get(pos));
        }
        assert_eq!(grid.get(Position::new(2, 2)), Some(BlueOwl));
        assert_eq!(grid.get(Position::new(2, 1)), Some(GreenOwl));
    }

    #[test]
    fn full_scope_refills_every_removed_column() {
        let mut grid = sample();
        let mut rng = StdRng::seed_from_u64(3);
        let removed: Vec<Position> = (0..4).map(|x| Position::new(x, 3)).collect();
        let new = remove_and_refill(&mut grid, &removed, Level::One, true, ColumnScope::Full, &mut rng);
        assert_eq!(new.len(), 4);
        assert!(new.iter().all(|p| p.y == 0));
        assert_eq!(grid.get(Position::new(3, 3)), Some(BlueOwl));
        assert!(!grid.has_trigger());
    }

    #[test]
    fn refill_respects_existing_trigger() {
        let mut grid = sample();
        grid.set(Position::new(3, 3), FreeGame);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..300 {
            let removed: Vec<Position> = (0..3)
                .flat_map(|x| (0..4).map(move |y| Position::new(x, y)))
                .collect();
            remove_and_refill(
                &mut grid,
                &removed,
                Level::One,
                false,
                ColumnScope::Surgical,
                &mut rng,
            );
            assert_eq!(grid.count(FreeGame), 1);
        }
    }

    #[test]
    fn out_of_bounds_positions_are_ignored() {
        let before = sample();
        let mut grid = before.clone();
        let mut rng = StdRng::seed_from_u64(5);
        let new = remove_and_refill(
            &mut grid,
            &[Position::new(9, 0)],
            Level::One,
            false,
            ColumnScope::Surgical,
            &mut rng,
        );
        assert!(new.is_empty());
        assert_eq!(grid, before);
    }
}
