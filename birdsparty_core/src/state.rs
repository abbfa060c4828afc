use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::connections::{Connection, ProgressionSymbol};
use crate::grid::Grid;
use crate::symbols::Level;

/// Allowed bet amounts and the integer payout multiplier each one maps to.
pub const BET_MULTIPLIERS: [(f64, u32); 5] = [(0.1, 1), (0.2, 2), (0.3, 3), (0.5, 5), (1.0, 10)];

/// Free spins awarded by one trigger.
pub const FREE_SPINS_AWARDED: u32 = 10;

/// Multipliers a free-spin round may draw, uniformly.
pub const FREE_SPIN_MULTIPLIERS: [f64; 9] = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0];

pub fn bet_multiplier(amount: f64) -> Option<u32> {
    BET_MULTIPLIERS
        .iter()
        .find(|(allowed, _)| (allowed - amount).abs() < 1e-9)
        .map(|(_, multiplier)| *multiplier)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Bet {
    pub amount: f64,
    #[serde(default)]
    pub multiplier: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameMode {
    #[default]
    #[serde(rename = "base", alias = "")]
    Base,
    #[serde(rename = "freeSpins")]
    FreeSpins,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FreeSpins {
    pub remaining: u32,
    pub total_awarded: u32,
    /// Scales every step win while free spins run, in `[1.0, 5.0]`.
    pub multiplier: f64,
}

impl Default for FreeSpins {
    fn default() -> Self {
        Self {
            remaining: 0,
            total_awarded: 0,
            multiplier: 1.0,
        }
    }
}

/// Where a resolution chain stands, judged from the state alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Chain complete; the next call is a spin.
    Idle,
    /// Progression symbols await processing.
    PendingProgression,
    /// Connections await removal by a cascade call.
    PendingCascade,
}

/// Everything the caller round-trips between calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub bet: Bet,
    /// `None` until the first spin initialises the state (wire value `0`).
    #[serde(default, with = "level_or_zero")]
    pub current_level: Option<Level>,
    #[serde(default)]
    pub grid_size: usize,
    #[serde(default)]
    pub grid: Grid,
    #[serde(default)]
    pub stage_progress: u32,
    #[serde(default)]
    pub game_mode: GameMode,
    #[serde(default)]
    pub free_spins: FreeSpins,
    #[serde(default)]
    pub total_win: f64,
    #[serde(default)]
    pub cascading: bool,
    #[serde(default)]
    pub last_connections: Vec<Connection>,
    #[serde(default)]
    pub cascade_count: u32,
    #[serde(default, rename = "stageClearedSymbols")]
    pub pending_progression: Vec<ProgressionSymbol>,
}

impl GameState {
    /// Level 1, base mode, empty grid, keeping the caller's bet.
    pub fn initial(bet: Bet) -> Self {
        Self {
            bet,
            current_level: Some(Level::One),
            grid_size: Level::One.grid_size(),
            ..Self::default()
        }
    }

    pub fn in_free_spins(&self) -> bool {
        self.game_mode == GameMode::FreeSpins
    }

    /// Step wins are scaled by this before they reach `total_win`.
    pub fn win_multiplier(&self) -> f64 {
        if self.in_free_spins() {
            self.free_spins.multiplier
        } else {
            1.0
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.pending_progression.is_empty() {
            Phase::PendingProgression
        } else if self.cascading {
            Phase::PendingCascade
        } else {
            Phase::Idle
        }
    }

    pub(crate) fn set_level(&mut self, level: Level) {
        self.current_level = Some(level);
        self.grid_size = level.grid_size();
    }

    pub(crate) fn start_free_spins(&mut self, multiplier: f64) {
        self.game_mode = GameMode::FreeSpins;
        self.free_spins = FreeSpins {
            remaining: FREE_SPINS_AWARDED,
            total_awarded: FREE_SPINS_AWARDED,
            multiplier,
        };
    }

    pub(crate) fn end_free_spins(&mut self) {
        self.game_mode = GameMode::Base;
        self.free_spins = FreeSpins::default();
    }
}

mod level_or_zero {
    use super::*;

    pub fn serialize<S: Serializer>(level: &Option<Level>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(level.map_or(0, Level::number))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Level>, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(None),
            n => Level::try_from(n).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_bets_are_accepted() {
        assert_eq!(bet_multiplier(0.1), Some(1));
        assert_eq!(bet_multiplier(0.3), Some(3));
        assert_eq!(bet_multiplier(1.0), Some(10));
        assert_eq!(bet_multiplier(2.0), None);
        assert_eq!(bet_multiplier(0.0), None);
    }

    #[test]
    fn zero_level_decodes_as_uninitialised() {
        let state: GameState =
            serde_json::from_str(r#"{"bet":{"amount":0.2},"currentLevel":0}"#).unwrap();
        assert_eq!(state.current_level, None);
        assert_eq!(state.game_mode, GameMode::Base);
        assert_eq!(state.free_spins.multiplier, 1.0);
        assert!(serde_json::from_str::<GameState>(r#"{"currentLevel":7}"#).is_err());
    }

    #[test]
    fn wire_names_round_trip() {
        let mut state = GameState::initial(Bet {
            amount: 0.5,
            multiplier: 5,
        });
        state.start_free_spins(2.5);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["currentLevel"], 1);
        assert_eq!(json["gridSize"], 4);
        assert_eq!(json["gameMode"], "freeSpins");
        assert_eq!(json["freeSpins"]["totalAwarded"], 10);
        assert!(json["stageClearedSymbols"].is_array());
    }

    #[test]
    fn phase_prefers_pending_progression() {
        let mut state = GameState::initial(Bet::default());
        assert_eq!(state.phase(), Phase::Idle);
        state.cascading = true;
        assert_eq!(state.phase(), Phase::PendingCascade);
        state.pending_progression.push(crate::connections::ProgressionSymbol {
            symbol: crate::symbols::Symbol::OrangeSlice,
            position: crate::grid::Position::new(0, 0),
        });
        assert_eq!(state.phase(), Phase::PendingProgression);
    }
}
