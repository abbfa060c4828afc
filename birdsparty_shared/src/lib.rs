use birdsparty_core::{
    CascadeOutcome, Connection, EngineError, GameState, Level, Phase, ProgressionOutcome,
    ProgressionSymbol, RequestIds, SpinOutcome,
};
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// Body of every game operation: the round-tripped state plus the four
/// request identifiers at the top level.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GameRequest {
    #[serde(rename = "gameState", default)]
    pub game_state: GameState,
    #[serde(flatten)]
    pub ids: RequestIds,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub status: String,
    pub message: String,
    pub game_state: GameState,
    pub stage_cleared_symbols: Vec<ProgressionSymbol>,
    pub has_stage_cleared: bool,
    pub total_cost: f64,
    pub phase: Phase,
}

impl From<SpinOutcome> for SpinResponse {
    fn from(out: SpinOutcome) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            message: String::new(),
            has_stage_cleared: out.has_progression(),
            phase: out.state.phase(),
            stage_cleared_symbols: out.progression_symbols,
            total_cost: out.total_cost,
            game_state: out.state,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStageClearedResponse {
    pub status: String,
    pub message: String,
    pub game_state: GameState,
    pub stage_cleared_count: usize,
    pub level_advanced: bool,
    pub old_level: Level,
    pub new_level: Level,
    pub connections: Vec<Connection>,
    pub stage_cleared_symbols: Vec<ProgressionSymbol>,
    pub has_stage_cleared: bool,
    pub total_cost: f64,
    pub phase: Phase,
}

impl From<ProgressionOutcome> for ProcessStageClearedResponse {
    fn from(out: ProgressionOutcome) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            message: String::new(),
            stage_cleared_count: out.processed.len(),
            level_advanced: out.advancement.advanced,
            old_level: out.advancement.old_level,
            new_level: out.advancement.new_level,
            connections: out.connections,
            has_stage_cleared: !out.progression_symbols.is_empty(),
            stage_cleared_symbols: out.progression_symbols,
            total_cost: 0.0,
            phase: out.state.phase(),
            game_state: out.state,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResponse {
    pub status: String,
    pub message: String,
    pub game_state: GameState,
    pub connections: Vec<Connection>,
    pub stage_cleared_symbols: Vec<ProgressionSymbol>,
    pub has_stage_cleared: bool,
    pub total_cost: f64,
    pub phase: Phase,
}

impl From<CascadeOutcome> for CascadeResponse {
    fn from(out: CascadeOutcome) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            message: String::new(),
            connections: out.connections,
            has_stage_cleared: !out.progression_symbols.is_empty(),
            stage_cleared_symbols: out.progression_symbols,
            total_cost: 0.0,
            phase: out.state.phase(),
            game_state: out.state,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Invalid(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            status: STATUS_ERROR.into(),
            message: self.to_string(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        if err.is_validation() {
            ApiError::Invalid(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
