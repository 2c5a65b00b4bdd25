//! Messages exchanged with the remote game service.

use mosaic_core::{Move, PositionKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stored copy of the game to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateVariant {
    /// The last persisted position
    Saved,
    /// The position the session started from
    Initial,
}

impl fmt::Display for StateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateVariant::Saved => write!(f, "saved"),
            StateVariant::Initial => write!(f, "initial"),
        }
    }
}

/// A candidate move submitted to the authoritative engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub position_key: PositionKey,
    #[serde(rename = "move")]
    pub mv: Move,
    pub player_index: usize,
}

/// The engine's verdict on a submitted move
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub success: bool,
    #[serde(default)]
    pub new_position_key: Option<PositionKey>,
    #[serde(default)]
    pub engine_response: Option<serde_json::Value>,
    #[serde(default)]
    pub game_over: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MoveResponse {
    pub fn accepted(new_key: PositionKey) -> Self {
        Self {
            success: true,
            new_position_key: Some(new_key),
            ..Self::default()
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
