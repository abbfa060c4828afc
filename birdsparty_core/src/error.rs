use thiserror::Error;

use crate::symbols::Level;

/// Failure reported by an upstream settings or RNG service.
#[derive(Debug, Error)]
#[error("{service}: {reason}")]
pub struct ServiceError {
    pub service: &'static str,
    pub reason: String,
}

impl ServiceError {
    pub fn new(service: &'static str, reason: impl Into<String>) -> Self {
        Self {
            service,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid bet amount, allowed values are 0.1, 0.2, 0.3, 0.5, 1.0")]
    InvalidBetAmount(f64),
    #[error("game state has no level; spin first")]
    MissingLevel,
    #[error("Invalid grid dimensions")]
    GridDimensions { level: Level, expected: usize },
    #[error("invalid game state: {0}")]
    InvalidState(&'static str),
    #[error("Failed to retrieve game settings")]
    Settings(#[source] ServiceError),
    #[error("Failed to determine outcome")]
    Outcome(#[source] ServiceError),
}

impl EngineError {
    /// Rejected before any game logic ran.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::Settings(_) | EngineError::Outcome(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_contract() {
        assert_eq!(
            EngineError::MissingField("client_id").to_string(),
            "client_id is required"
        );
        let err = EngineError::Outcome(ServiceError::new("rng", "timeout"));
        assert_eq!(err.to_string(), "Failed to determine outcome");
        assert!(!err.is_validation());
        assert!(EngineError::InvalidBetAmount(7.0).is_validation());
        assert!(EngineError::InvalidState("stageProgress must be below 15").is_validation());
    }
}
