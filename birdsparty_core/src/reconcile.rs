//! Honouring a "loss" verdict after the grid has already been shown.
//!
//! Only cells generated in the current step may change. Each attempt redraws
//! a few of them on a scratch copy; the first copy without connections
//! replaces the live grid. When no attempt succeeds the natural win stands
//! and the step reports itself as bypassed.

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, warn};

use crate::connections::{find_connections, Connection};
use crate::grid::{Grid, Position};
use crate::symbols::{Level, Symbol};

pub const MAX_RECONCILE_ATTEMPTS: usize = 50;

/// Cells redrawn per attempt after progression processing.
pub const PROGRESSION_EDIT_BUDGET: usize = 3;

/// Cells redrawn per attempt after a cascade refill.
pub const CASCADE_EDIT_BUDGET: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Connections still standing on the grid.
    pub connections: Vec<Connection>,
    /// True when the loss could not be produced and the win was kept.
    pub bypassed: bool,
}

/// Tries to remove every connection by redrawing cells in `editable` only.
/// Groups listed in `settled` were paid by an earlier step and may remain.
#[allow(clippy::too_many_arguments)]
pub fn reconcile<R: Rng + ?Sized>(
    grid: &mut Grid,
    candidates: Vec<Connection>,
    settled: &[Connection],
    editable: &[Position],
    level: Level,
    forbid_trigger: bool,
    edit_budget: usize,
    rng: &mut R,
) -> Reconciliation {
    if candidates.is_empty() {
        return Reconciliation {
            connections: candidates,
            bypassed: false,
        };
    }

    let mut surface: Vec<Position> = editable.iter().copied().filter(|p| grid.contains(*p)).collect();
    surface.sort_unstable();
    surface.dedup();
    if surface.is_empty() || edit_budget == 0 {
        warn!(connections = candidates.len(), "no editable cells, keeping win");
        return Reconciliation {
            connections: candidates,
            bypassed: true,
        };
    }

    let table = level.weights();
    let picks = edit_budget.min(surface.len());
    for attempt in 0..MAX_RECONCILE_ATTEMPTS {
        let mut scratch = grid.clone();
        for pos in surface.choose_multiple(rng, picks).copied() {
            let here = usize::from(scratch.get(pos) == Some(Symbol::FreeGame));
            let trigger_elsewhere = scratch.count(Symbol::FreeGame) > here;
            let symbol = table.draw(rng, forbid_trigger || trigger_elsewhere);
            scratch.set(pos, symbol);
            let remaining = find_connections(&scratch, level);
            if remaining
                .iter()
                .all(|c| settled.iter().any(|s| s.same_group(c)))
            {
                debug!(attempt, x = pos.x, y = pos.y, %symbol, "loss reconciled");
                *grid = scratch;
                return Reconciliation {
                    connections: remaining,
                    bypassed: false,
                };
            }
        }
    }

    warn!(
        connections = candidates.len(),
        editable = surface.len(),
        "reconciliation exhausted, keeping win"
    );
    Reconciliation {
        connections: candidates,
        bypassed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use Symbol::*;

    // Purple run on the top row; every other cell alternates so nothing else
    // connects.
    fn top_row_win() -> Grid {
        Grid::from_rows(vec![
            vec![PurpleOwl, PurpleOwl, PurpleOwl, PurpleOwl],
            vec![RedOwl, BlueOwl, RedOwl, BlueOwl],
            vec![BlueOwl, RedOwl, BlueOwl, RedOwl],
            vec![RedOwl, BlueOwl, RedOwl, BlueOwl],
        ])
    }

    #[test]
    fn breaks_connection_through_editable_cell() {
        let mut grid = top_row_win();
        let before = grid.clone();
        let candidates = find_connections(&grid, Level::One);
        let editable = [Position::new(1, 0)];
        let mut rng = StdRng::seed_from_u64(8);
        let result = reconcile(&mut grid, candidates, &[], &editable, Level::One, false, 3, &mut rng);
        assert!(!result.bypassed);
        assert!(result.connections.is_empty());
        assert!(find_connections(&grid, Level::One).is_empty());
        for pos in before.positions().filter(|p| *p != Position::new(1, 0)) {
            assert_eq!(grid.get(pos), before.get(pos));
        }
    }

    #[test]
    fn unreachable_connection_is_bypassed() {
        let mut grid = top_row_win();
        let before = grid.clone();
        let candidates = find_connections(&grid, Level::One);
        let editable = [Position::new(0, 3), Position::new(1, 3)];
        let mut rng = StdRng::seed_from_u64(9);
        let result = reconcile(&mut grid, candidates.clone(), &[], &editable, Level::One, false, 4, &mut rng);
        assert!(result.bypassed);
        assert_eq!(result.connections, candidates);
        assert_eq!(grid, before);
    }

    #[test]
    fn empty_surface_is_bypassed() {
        let mut grid = top_row_win();
        let candidates = find_connections(&grid, Level::One);
        let mut rng = StdRng::seed_from_u64(10);
        let result = reconcile(&mut grid, candidates, &[], &[], Level::One, false, 3, &mut rng);
        assert!(result.bypassed);
        assert_eq!(result.connections.len(), 1);
    }

    #[test]
    fn no_candidates_is_a_no_op() {
        let mut grid = top_row_win();
        grid.set(Position::new(0, 0), OrangeSlice);
        let before = grid.clone();
        let mut rng = StdRng::seed_from_u64(11);
        let result = reconcile(&mut grid, Vec::new(), &[], &[Position::new(1, 0)], Level::One, false, 3, &mut rng);
        assert!(!result.bypassed);
        assert_eq!(grid, before);
    }

    #[test]
    fn settled_groups_may_remain() {
        // Bottom row is an already-paid purple run out of reach; the top row
        // run is fresh and editable.
        let mut grid = Grid::from_rows(vec![
            vec![RedOwl, RedOwl, RedOwl, RedOwl],
            vec![BlueOwl, GreenOwl, BlueOwl, GreenOwl],
            vec![GreenOwl, BlueOwl, GreenOwl, BlueOwl],
            vec![PurpleOwl, PurpleOwl, PurpleOwl, PurpleOwl],
        ]);
        let all = find_connections(&grid, Level::One);
        let settled: Vec<Connection> = all.iter().filter(|c| c.symbol == PurpleOwl).cloned().collect();
        let fresh: Vec<Connection> = all.into_iter().filter(|c| c.symbol == RedOwl).collect();
        let editable: Vec<Position> = (0..4).map(|x| Position::new(x, 0)).collect();
        let mut rng = StdRng::seed_from_u64(12);
        let result = reconcile(&mut grid, fresh, &settled, &editable, Level::One, false, 3, &mut rng);
        assert!(!result.bypassed);
        assert_eq!(result.connections.len(), 1);
        assert!(result.connections[0].same_group(&settled[0]));
    }
}
