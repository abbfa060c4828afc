use rand::Rng;
use tracing::info;

use crate::connections::ProgressionSymbol;
use crate::editor::{remove_and_refill, ColumnScope};
use crate::grid::{generate, Position};
use crate::state::GameState;
use crate::symbols::{Level, STAGE_PROGRESS_TARGET};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advancement {
    pub advanced: bool,
    pub old_level: Level,
    pub new_level: Level,
    /// Cells holding freshly generated symbols after this step: the refilled
    /// cells, or the whole grid when the level changed.
    pub new_positions: Vec<Position>,
}

/// Removes `found` from the grid, refills their columns and credits them to
/// stage progress. Reaching the target advances the level cyclically,
/// carries the overflow into the new level and regenerates the grid at the
/// new size. An empty `found` leaves the state untouched.
pub fn advance<R: Rng + ?Sized>(
    state: &mut GameState,
    found: &[ProgressionSymbol],
    level: Level,
    forbid_trigger: bool,
    rng: &mut R,
) -> Advancement {
    if found.is_empty() {
        return Advancement {
            advanced: false,
            old_level: level,
            new_level: level,
            new_positions: Vec::new(),
        };
    }

    let removed: Vec<Position> = found.iter().map(|p| p.position).collect();
    let refilled = remove_and_refill(
        &mut state.grid,
        &removed,
        level,
        forbid_trigger,
        ColumnScope::Surgical,
        rng,
    );
    state.stage_progress = state
        .stage_progress
        .saturating_add(u32::try_from(found.len()).unwrap_or(u32::MAX));
    info!(
        added = found.len(),
        progress = state.stage_progress,
        target = STAGE_PROGRESS_TARGET,
        "stage progress updated"
    );

    if state.stage_progress < STAGE_PROGRESS_TARGET {
        return Advancement {
            advanced: false,
            old_level: level,
            new_level: level,
            new_positions: refilled,
        };
    }

    let excess = state.stage_progress - STAGE_PROGRESS_TARGET;
    let next = level.next();
    state.set_level(next);
    state.stage_progress = excess;
    state.grid = generate(next, forbid_trigger, rng);
    info!(from = %level, to = %next, excess, "level advanced");

    Advancement {
        advanced: true,
        old_level: level,
        new_level: next,
        new_positions: state.grid.positions().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::state::Bet;
    use crate::symbols::Symbol;
    use rand::{rngs::StdRng, SeedableRng};

    fn state_with(level: Level, progress: u32, marks: &[Position]) -> (GameState, Vec<ProgressionSymbol>) {
        let mut state = GameState::initial(Bet {
            amount: 0.1,
            multiplier: 1,
        });
        state.set_level(level);
        state.stage_progress = progress;
        state.grid = Grid::filled(level.grid_size(), Symbol::BlueOwl);
        let found: Vec<ProgressionSymbol> = marks
            .iter()
            .map(|pos| {
                state.grid.set(*pos, level.progression_symbol());
                ProgressionSymbol {
                    symbol: level.progression_symbol(),
                    position: *pos,
                }
            })
            .collect();
        (state, found)
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let (mut state, _) = state_with(Level::Two, 7, &[]);
        let before = state.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let adv = advance(&mut state, &[], Level::Two, false, &mut rng);
        assert!(!adv.advanced);
        assert_eq!(state, before);
    }

    #[test]
    fn below_target_refills_in_place() {
        let marks = [Position::new(1, 2), Position::new(3, 0)];
        let (mut state, found) = state_with(Level::One, 3, &marks);
        let mut rng = StdRng::seed_from_u64(2);
        let adv = advance(&mut state, &found, Level::One, false, &mut rng);
        assert!(!adv.advanced);
        assert_eq!(state.stage_progress, 5);
        assert_eq!(state.current_level, Some(Level::One));
        let mut columns: Vec<usize> = adv.new_positions.iter().map(|p| p.x).collect();
        columns.dedup();
        assert_eq!(columns, vec![1, 3]);
        for y in 0..4 {
            assert_eq!(state.grid.get(Position::new(0, y)), Some(Symbol::BlueOwl));
            assert_eq!(state.grid.get(Position::new(2, y)), Some(Symbol::BlueOwl));
        }
    }

    #[test]
    fn overflow_carries_into_next_level() {
        let marks = [
            Position::new(0, 0),
            Position::new(1, 1),
            Position::new(2, 2),
            Position::new(3, 3),
        ];
        let (mut state, found) = state_with(Level::One, 13, &marks);
        let mut rng = StdRng::seed_from_u64(3);
        let adv = advance(&mut state, &found, Level::One, false, &mut rng);
        assert!(adv.advanced);
        assert_eq!((adv.old_level, adv.new_level), (Level::One, Level::Two));
        assert_eq!(state.stage_progress, 2);
        assert_eq!(state.grid_size, 5);
        assert!(state.grid.matches_level(Level::Two));
        assert_eq!(adv.new_positions.len(), 25);
    }

    #[test]
    fn level_three_wraps_to_one() {
        let (mut state, found) = state_with(Level::Three, 14, &[Position::new(5, 5)]);
        let mut rng = StdRng::seed_from_u64(4);
        let adv = advance(&mut state, &found, Level::Three, true, &mut rng);
        assert!(adv.advanced);
        assert_eq!(adv.new_level, Level::One);
        assert_eq!(state.stage_progress, 0);
        assert_eq!(state.grid.size(), 4);
        assert!(!state.grid.has_trigger());
    }
}
