use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Position};
use crate::paytable::Paytable;
use crate::symbols::{Level, Symbol};

/// A 4-directionally connected group of one bird symbol, at least the
/// level's minimum size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub symbol: Symbol,
    pub positions: Vec<Position>,
    pub count: usize,
    /// Money paid for this group at the current bet multiplier.
    pub payout: f64,
}

impl Connection {
    /// Same symbol over the same cells, whatever the traversal order.
    pub fn same_group(&self, other: &Connection) -> bool {
        if self.symbol != other.symbol || self.count != other.count {
            return false;
        }
        let mut a = self.positions.clone();
        let mut b = other.positions.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

/// One progression symbol found on the grid and awaiting removal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionSymbol {
    pub symbol: Symbol,
    pub position: Position,
}

/// Flood-fills the grid in row-major order and returns every qualifying
/// bird group. Payouts are computed at bet multiplier 1; see [`settle`].
pub fn find_connections(grid: &Grid, level: Level) -> Vec<Connection> {
    let size = grid.size();
    let min = level.min_connection();
    let paytable = Paytable::for_level(level);
    let mut visited = vec![vec![false; size]; size];
    let mut connections = Vec::new();

    for start in grid.positions() {
        if visited[start.y][start.x] {
            continue;
        }
        let Some(symbol) = grid.get(start).filter(|s| s.is_regular()) else {
            continue;
        };
        let positions = flood(grid, start, symbol, &mut visited);
        if positions.len() >= min {
            let count = positions.len();
            connections.push(Connection {
                symbol,
                positions,
                count,
                payout: paytable.payout(symbol, count, 1),
            });
        }
    }
    connections
}

fn flood(grid: &Grid, start: Position, symbol: Symbol, visited: &mut [Vec<bool>]) -> Vec<Position> {
    let size = grid.size();
    let mut positions = Vec::new();
    let mut stack = vec![start];
    visited[start.y][start.x] = true;

    while let Some(pos) = stack.pop() {
        positions.push(pos);
        let mut neighbours = Vec::with_capacity(4);
        if pos.x + 1 < size {
            neighbours.push(Position::new(pos.x + 1, pos.y));
        }
        if pos.x > 0 {
            neighbours.push(Position::new(pos.x - 1, pos.y));
        }
        if pos.y + 1 < size {
            neighbours.push(Position::new(pos.x, pos.y + 1));
        }
        if pos.y > 0 {
            neighbours.push(Position::new(pos.x, pos.y - 1));
        }
        for next in neighbours {
            if !visited[next.y][next.x] && grid.get(next) == Some(symbol) {
                visited[next.y][next.x] = true;
                stack.push(next);
            }
        }
    }
    positions
}

/// Prices connections at `bet_multiplier` and returns their summed payout.
pub fn settle(connections: &mut [Connection], level: Level, bet_multiplier: u32) -> f64 {
    let paytable = Paytable::for_level(level);
    connections
        .iter_mut()
        .map(|c| {
            c.payout = paytable.payout(c.symbol, c.count, bet_multiplier);
            c.payout
        })
        .sum()
}

/// Row-major scan for the level's own progression symbol.
pub fn find_progression_symbols(grid: &Grid, level: Level) -> Vec<ProgressionSymbol> {
    let target = level.progression_symbol();
    grid.positions()
        .filter(|pos| grid.get(*pos) == Some(target))
        .map(|position| ProgressionSymbol {
            symbol: target,
            position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn grid(rows: &[&[Symbol]]) -> Grid {
        Grid::from_rows(rows.iter().map(|r| r.to_vec()).collect())
    }

    #[test]
    fn l_shaped_group_is_one_connection() {
        let g = grid(&[
            &[RedOwl, BlueOwl, GreenOwl, YellowOwl],
            &[RedOwl, GreenOwl, BlueOwl, GreenOwl],
            &[RedOwl, RedOwl, YellowOwl, BlueOwl],
            &[GreenOwl, BlueOwl, GreenOwl, YellowOwl],
        ]);
        let found = find_connections(&g, Level::One);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, RedOwl);
        assert_eq!(found[0].count, 4);
    }

    #[test]
    fn diagonals_do_not_connect() {
        let g = grid(&[
            &[RedOwl, BlueOwl, RedOwl, BlueOwl],
            &[BlueOwl, RedOwl, BlueOwl, RedOwl],
            &[RedOwl, BlueOwl, RedOwl, BlueOwl],
            &[BlueOwl, RedOwl, BlueOwl, RedOwl],
        ]);
        assert!(find_connections(&g, Level::One).is_empty());
    }

    #[test]
    fn special_symbols_break_groups() {
        let g = grid(&[
            &[BlueOwl, BlueOwl, OrangeSlice, BlueOwl],
            &[GreenOwl, RedOwl, FreeGame, BlueOwl],
            &[RedOwl, GreenOwl, RedOwl, GreenOwl],
            &[GreenOwl, RedOwl, GreenOwl, RedOwl],
        ]);
        assert!(find_connections(&g, Level::One).is_empty());
        assert!(find_connections(&Grid::filled(4, OrangeSlice), Level::One).is_empty());
    }

    #[test]
    fn full_grid_is_single_group() {
        let found = find_connections(&Grid::filled(5, YellowOwl), Level::Two);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].count, 25);
    }

    #[test]
    fn settle_applies_bet_multiplier() {
        let mut found = find_connections(&Grid::filled(4, PurpleOwl), Level::One);
        let total = settle(&mut found, Level::One, 5);
        assert_eq!(found[0].payout, 0.8);
        assert_eq!(total, 0.8);
    }

    #[test]
    fn same_group_ignores_position_order() {
        let mut found = find_connections(&Grid::filled(4, RedOwl), Level::One);
        let mut reversed = found[0].clone();
        reversed.positions.reverse();
        assert!(found[0].same_group(&reversed));
        found[0].positions.pop();
        assert!(!found[0].same_group(&reversed));
    }

    #[test]
    fn progression_scan_only_matches_level_symbol() {
        let g = grid(&[
            &[OrangeSlice, BlueOwl, HoneyPot, BlueOwl],
            &[GreenOwl, RedOwl, GreenOwl, OrangeSlice],
            &[RedOwl, GreenOwl, RedOwl, GreenOwl],
            &[GreenOwl, RedOwl, GreenOwl, RedOwl],
        ]);
        let found = find_progression_symbols(&g, Level::One);
        let positions: Vec<Position> = found.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![Position::new(0, 0), Position::new(3, 1)]);
        assert!(find_progression_symbols(&g, Level::Three).is_empty());
    }
}
