use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    connections::{find_connections, find_progression_symbols, settle, Connection, ProgressionSymbol},
    editor::{remove_and_refill, ColumnScope},
    error::{EngineError, EngineResult},
    grid::{generate_with_connection, generate_without_connection, Grid, Position},
    progression::{self, Advancement},
    reconcile::{reconcile, CASCADE_EDIT_BUDGET, PROGRESSION_EDIT_BUDGET},
    services::{OutcomeQuery, OutcomeService, PreferredOutcome, RequestIds, SettingsService},
    state::{bet_multiplier, GameState, Phase, FREE_SPIN_MULTIPLIERS},
    symbols::{Level, STAGE_PROGRESS_TARGET},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SpinOutcome {
    pub state: GameState,
    pub progression_symbols: Vec<ProgressionSymbol>,
    /// What the player paid: the bet in base mode, nothing on a free spin.
    pub total_cost: f64,
    pub free_spin: bool,
}

impl SpinOutcome {
    pub fn has_progression(&self) -> bool {
        !self.progression_symbols.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionOutcome {
    pub state: GameState,
    /// Progression symbols removed by this call.
    pub processed: Vec<ProgressionSymbol>,
    pub advancement: Advancement,
    /// Every connection standing on the grid afterwards.
    pub connections: Vec<Connection>,
    /// Progression symbols standing on the grid afterwards.
    pub progression_symbols: Vec<ProgressionSymbol>,
    pub step_win: f64,
    pub bypassed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub state: GameState,
    pub connections: Vec<Connection>,
    pub progression_symbols: Vec<ProgressionSymbol>,
    pub step_win: f64,
    pub bypassed: bool,
}

impl CascadeOutcome {
    pub fn has_more(&self) -> bool {
        self.state.cascading
    }
}

/// Resolves one chain: a spin, then any number of progression and cascade
/// steps until the state is idle again. Holds no per-player state; every
/// call takes the full [`GameState`] and returns the next one.
pub struct Engine<S, O> {
    config: EngineConfig,
    settings: S,
    outcomes: O,
}

impl<S: SettingsService, O: OutcomeService> Engine<S, O> {
    pub fn new(config: EngineConfig, settings: S, outcomes: O) -> Self {
        Self {
            config,
            settings,
            outcomes,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn outcomes(&self) -> &O {
        &self.outcomes
    }

    /// Starts a chain. An uninitialised state (no level) begins at level 1.
    pub async fn spin<R: Rng + Send + ?Sized>(
        &self,
        ids: &RequestIds,
        mut state: GameState,
        rng: &mut R,
    ) -> EngineResult<SpinOutcome> {
        ids.validate()?;
        let multiplier = validate_bet(&state)?;
        let level = match state.current_level {
            Some(level) => level,
            None => {
                info!(player_id = %ids.player_id, "initialising game state");
                state = GameState::initial(state.bet);
                Level::One
            }
        };
        validate_state(&state)?;
        state.bet.multiplier = multiplier;
        state.grid_size = level.grid_size();

        if state.in_free_spins() && state.free_spins.remaining == 0 {
            info!(player_id = %ids.player_id, "free spins exhausted, back to base mode");
            state.end_free_spins();
        }
        let free_spin = state.in_free_spins();
        let total_cost = if free_spin {
            state.free_spins.remaining -= 1;
            0.0
        } else {
            state.bet.amount
        };

        let forbid_trigger = state.in_free_spins();
        state.grid = generate_with_connection(level, forbid_trigger, rng);
        let mut connections = find_connections(&state.grid, level);
        let mut step_win = self.price(&mut connections, &state, level);

        if !connections.is_empty()
            && self.verdict(ids, &state, step_win).await? == PreferredOutcome::Loss
        {
            state.grid = generate_without_connection(level, forbid_trigger, rng);
            connections = find_connections(&state.grid, level);
            step_win = self.price(&mut connections, &state, level);
            if connections.is_empty() {
                debug!("loss grid generated");
            } else {
                warn!(connections = connections.len(), "loss grid still connects, paying it");
            }
        }

        let progression_symbols = find_progression_symbols(&state.grid, level);
        state.pending_progression = progression_symbols.clone();
        state.cascade_count = 0;
        state.total_win = step_win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections;
        self.maybe_award_free_spins(&mut state, rng);

        info!(
            player_id = %ids.player_id,
            bet_id = %ids.bet_id,
            level = %level,
            connections = state.last_connections.len(),
            win = state.total_win,
            progression = progression_symbols.len(),
            free_spin,
            "spin resolved"
        );
        Ok(SpinOutcome {
            state,
            progression_symbols,
            total_cost,
            free_spin,
        })
    }

    /// Removes pending progression symbols, credits stage progress and, if
    /// the target is reached, advances the level with a fresh grid.
    pub async fn process_progression<R: Rng + Send + ?Sized>(
        &self,
        ids: &RequestIds,
        mut state: GameState,
        rng: &mut R,
    ) -> EngineResult<ProgressionOutcome> {
        ids.validate()?;
        let multiplier = validate_bet(&state)?;
        let level = validate_level(&state)?;
        validate_state(&state)?;
        state.bet.multiplier = multiplier;

        let pending = std::mem::take(&mut state.pending_progression);
        let processed = verified_progression(&state.grid, level, pending);
        let forbid_trigger = self.config.progression_trigger.forbids_trigger(&state);
        let advancement = progression::advance(&mut state, &processed, level, forbid_trigger, rng);
        let level = advancement.new_level;

        // Groups untouched by the removal were already paid.
        let settled: Vec<Connection> = if advancement.advanced {
            Vec::new()
        } else {
            std::mem::take(&mut state.last_connections)
        };
        let mut connections = find_connections(&state.grid, level);
        let mut fresh = unsettled(&connections, &settled);
        let mut step_win = self.price(&mut fresh, &state, level);
        let mut bypassed = false;

        if !fresh.is_empty() && self.verdict(ids, &state, step_win).await? == PreferredOutcome::Loss {
            let forbid = state.in_free_spins();
            let result = reconcile(
                &mut state.grid,
                fresh,
                &settled,
                &advancement.new_positions,
                level,
                forbid,
                PROGRESSION_EDIT_BUDGET,
                rng,
            );
            bypassed = result.bypassed;
            connections = find_connections(&state.grid, level);
            fresh = unsettled(&connections, &settled);
            step_win = self.price(&mut fresh, &state, level);
        }
        settle(&mut connections, level, multiplier);

        let progression_symbols = find_progression_symbols(&state.grid, level);
        state.pending_progression = progression_symbols.clone();
        state.cascade_count = 0;
        state.total_win += step_win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections.clone();
        if state.phase() == Phase::Idle {
            self.maybe_award_free_spins(&mut state, rng);
        }

        info!(
            player_id = %ids.player_id,
            processed = processed.len(),
            progress = state.stage_progress,
            advanced = advancement.advanced,
            level = %level,
            step_win,
            bypassed,
            "progression processed"
        );
        Ok(ProgressionOutcome {
            state,
            processed,
            advancement,
            connections,
            progression_symbols,
            step_win,
            bypassed,
        })
    }

    /// Removes the connections from the previous step, drops and refills the
    /// affected columns and pays whatever connects next. With nothing
    /// pending, the grid is checked as sent.
    pub async fn cascade<R: Rng + Send + ?Sized>(
        &self,
        ids: &RequestIds,
        mut state: GameState,
        rng: &mut R,
    ) -> EngineResult<CascadeOutcome> {
        ids.validate()?;
        let multiplier = validate_bet(&state)?;
        let level = validate_level(&state)?;
        validate_state(&state)?;
        state.bet.multiplier = multiplier;
        state.cascade_count = state.cascade_count.saturating_add(1);

        let forbid_trigger = state.in_free_spins();
        let editable = if state.last_connections.is_empty() {
            Vec::new()
        } else {
            let removed: Vec<Position> = state
                .last_connections
                .iter()
                .flat_map(|c| c.positions.iter().copied())
                .collect();
            remove_and_refill(
                &mut state.grid,
                &removed,
                level,
                forbid_trigger,
                ColumnScope::Surgical,
                rng,
            )
        };

        let mut connections = find_connections(&state.grid, level);
        let mut step_win = self.price(&mut connections, &state, level);
        let mut bypassed = false;

        if !connections.is_empty()
            && self.verdict(ids, &state, step_win).await? == PreferredOutcome::Loss
        {
            let result = reconcile(
                &mut state.grid,
                connections,
                &[],
                &editable,
                level,
                forbid_trigger,
                CASCADE_EDIT_BUDGET,
                rng,
            );
            bypassed = result.bypassed;
            connections = result.connections;
            step_win = self.price(&mut connections, &state, level);
        }

        let progression_symbols = find_progression_symbols(&state.grid, level);
        state.pending_progression = progression_symbols.clone();
        state.total_win += step_win;
        state.cascading = !connections.is_empty();
        state.last_connections = connections.clone();
        if !state.cascading {
            self.maybe_award_free_spins(&mut state, rng);
        }

        info!(
            player_id = %ids.player_id,
            cascade = state.cascade_count,
            connections = connections.len(),
            step_win,
            total_win = state.total_win,
            bypassed,
            "cascade resolved"
        );
        Ok(CascadeOutcome {
            state,
            connections,
            progression_symbols,
            step_win,
            bypassed,
        })
    }

    /// Prices `connections` at the bet multiplier and applies the free-spin
    /// multiplier to their sum.
    fn price(&self, connections: &mut [Connection], state: &GameState, level: Level) -> f64 {
        settle(connections, level, state.bet.multiplier) * state.win_multiplier()
    }

    async fn verdict(
        &self,
        ids: &RequestIds,
        state: &GameState,
        step_win: f64,
    ) -> EngineResult<PreferredOutcome> {
        let rtp = self
            .settings
            .rtp(&ids.client_id, &ids.game_id, &ids.player_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "settings lookup failed");
                EngineError::Settings(e)
            })?;
        let query = OutcomeQuery {
            client_id: ids.client_id.clone(),
            game_id: ids.game_id.clone(),
            player_id: ids.player_id.clone(),
            bet_id: ids.bet_id.clone(),
            rtp,
            payout_multiplier: step_win / state.bet.amount,
            bet_amount: state.bet.amount,
        };
        let outcome = self.outcomes.preferred_outcome(&query).await.map_err(|e| {
            warn!(error = %e, "outcome lookup failed");
            EngineError::Outcome(e)
        })?;
        debug!(rtp, payout_multiplier = query.payout_multiplier, ?outcome, "outcome consulted");
        Ok(outcome)
    }

    fn maybe_award_free_spins<R: Rng + ?Sized>(&self, state: &mut GameState, rng: &mut R) {
        if state.in_free_spins() || !state.grid.has_trigger() {
            return;
        }
        let multiplier = FREE_SPIN_MULTIPLIERS.choose(rng).copied().unwrap_or(1.0);
        state.start_free_spins(multiplier);
        info!(multiplier, remaining = state.free_spins.remaining, "free spins awarded");
    }
}

fn validate_bet(state: &GameState) -> EngineResult<u32> {
    bet_multiplier(state.bet.amount).ok_or(EngineError::InvalidBetAmount(state.bet.amount))
}

/// Round-tripped values the engine never produces itself.
fn validate_state(state: &GameState) -> EngineResult<()> {
    if state.stage_progress >= STAGE_PROGRESS_TARGET {
        return Err(EngineError::InvalidState("stageProgress must be below 15"));
    }
    if state.in_free_spins() && !(1.0..=5.0).contains(&state.free_spins.multiplier) {
        return Err(EngineError::InvalidState(
            "freeSpins.multiplier must be between 1.0 and 5.0",
        ));
    }
    Ok(())
}

fn validate_level(state: &GameState) -> EngineResult<Level> {
    let level = state.current_level.ok_or(EngineError::MissingLevel)?;
    let expected = level.grid_size();
    if state.grid_size != expected || !state.grid.matches_level(level) {
        return Err(EngineError::GridDimensions { level, expected });
    }
    Ok(level)
}

/// Keeps in-bounds, correctly typed, distinct entries of the pending list.
/// When none survive, the grid itself is scanned.
fn verified_progression(
    grid: &Grid,
    level: Level,
    pending: Vec<ProgressionSymbol>,
) -> Vec<ProgressionSymbol> {
    let target = level.progression_symbol();
    let mut seen = BTreeSet::new();
    let valid: Vec<ProgressionSymbol> = pending
        .into_iter()
        .filter(|p| p.symbol == target && grid.get(p.position) == Some(target))
        .filter(|p| seen.insert(p.position))
        .collect();
    if valid.is_empty() {
        find_progression_symbols(grid, level)
    } else {
        valid
    }
}

fn unsettled(connections: &[Connection], settled: &[Connection]) -> Vec<Connection> {
    connections
        .iter()
        .filter(|c| !settled.iter().any(|s| s.same_group(c)))
        .cloned()
        .collect()
}
