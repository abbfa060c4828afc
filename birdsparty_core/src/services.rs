//! Upstream collaborators consulted by the engine, plus in-process
//! implementations for simulation and tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, ServiceError};

/// Identifiers every request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIds {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub bet_id: String,
}

impl RequestIds {
    pub fn new(
        client_id: impl Into<String>,
        game_id: impl Into<String>,
        player_id: impl Into<String>,
        bet_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            game_id: game_id.into(),
            player_id: player_id.into(),
            bet_id: bet_id.into(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let fields = [
            ("client_id", &self.client_id),
            ("game_id", &self.game_id),
            ("player_id", &self.player_id),
            ("bet_id", &self.bet_id),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(EngineError::MissingField(*name)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredOutcome {
    Win,
    Loss,
}

/// What the RNG service is asked for one resolution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeQuery {
    pub client_id: String,
    pub game_id: String,
    pub player_id: String,
    pub bet_id: String,
    pub rtp: f64,
    /// Step win divided by the bet amount.
    pub payout_multiplier: f64,
    pub bet_amount: f64,
}

#[async_trait]
pub trait SettingsService: Send + Sync {
    /// Target RTP for this client, game and player.
    async fn rtp(&self, client_id: &str, game_id: &str, player_id: &str)
        -> Result<f64, ServiceError>;
}

#[async_trait]
pub trait OutcomeService: Send + Sync {
    async fn preferred_outcome(&self, query: &OutcomeQuery)
        -> Result<PreferredOutcome, ServiceError>;
}

/// Returns the same RTP for everyone.
#[derive(Debug, Clone, Copy)]
pub struct StaticSettings(pub f64);

#[async_trait]
impl SettingsService for StaticSettings {
    async fn rtp(&self, _: &str, _: &str, _: &str) -> Result<f64, ServiceError> {
        Ok(self.0)
    }
}

/// Always prefers the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub PreferredOutcome);

#[async_trait]
impl OutcomeService for FixedOutcome {
    async fn preferred_outcome(&self, _: &OutcomeQuery) -> Result<PreferredOutcome, ServiceError> {
        Ok(self.0)
    }
}

/// Plays back a queue of outcomes, then repeats `fallback`. Every query is
/// recorded.
#[derive(Debug)]
pub struct ScriptedOutcomes {
    script: Mutex<VecDeque<PreferredOutcome>>,
    fallback: PreferredOutcome,
    queries: Mutex<Vec<OutcomeQuery>>,
}

impl ScriptedOutcomes {
    pub fn new(script: impl IntoIterator<Item = PreferredOutcome>, fallback: PreferredOutcome) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<OutcomeQuery> {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl OutcomeService for ScriptedOutcomes {
    async fn preferred_outcome(&self, query: &OutcomeQuery) -> Result<PreferredOutcome, ServiceError> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.clone());
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or(self.fallback))
    }
}
