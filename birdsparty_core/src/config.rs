use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::state::GameState;

/// Whether progression processing (refill and level regeneration) may place
/// the free-spin trigger symbol.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerPolicy {
    /// Never suppress the trigger, even during free spins.
    #[default]
    Allow,
    /// Suppress the trigger during free spins, like every other generation
    /// path.
    FollowGameMode,
}

impl TriggerPolicy {
    pub fn forbids_trigger(self, state: &GameState) -> bool {
        match self {
            TriggerPolicy::Allow => false,
            TriggerPolicy::FollowGameMode => state.in_free_spins(),
        }
    }
}

impl FromStr for TriggerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(TriggerPolicy::Allow),
            "follow-game-mode" => Ok(TriggerPolicy::FollowGameMode),
            other => Err(format!(
                "unknown trigger policy {other:?}, expected allow or follow-game-mode"
            )),
        }
    }
}

impl fmt::Display for TriggerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerPolicy::Allow => "allow",
            TriggerPolicy::FollowGameMode => "follow-game-mode",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub progression_trigger: TriggerPolicy,
}
