pub mod config;
pub mod connections;
pub mod editor;
pub mod engine;
pub mod error;
pub mod grid;
pub mod paytable;
pub mod progression;
pub mod reconcile;
pub mod rng;
pub mod services;
pub mod state;
pub mod symbols;

pub use crate::config::{EngineConfig, TriggerPolicy};
pub use crate::connections::{find_connections, find_progression_symbols, Connection, ProgressionSymbol};
pub use crate::editor::{remove_and_refill, ColumnScope};
pub use crate::engine::{CascadeOutcome, Engine, ProgressionOutcome, SpinOutcome};
pub use crate::error::{EngineError, EngineResult, ServiceError};
pub use crate::grid::{Grid, Position};
pub use crate::paytable::Paytable;
pub use crate::progression::Advancement;
pub use crate::rng::{derive_hash_hex, request_key, SeedDeriver};
pub use crate::services::{
    FixedOutcome, OutcomeQuery, OutcomeService, PreferredOutcome, RequestIds, ScriptedOutcomes,
    SettingsService, StaticSettings,
};
pub use crate::state::{Bet, FreeSpins, GameMode, GameState, Phase};
pub use crate::symbols::{Level, Symbol, WeightTable};
