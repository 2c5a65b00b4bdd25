//! The client-held game state.
//!
//! `GameState` is plain data. Every local change goes through a function
//! that takes `&GameState` and returns a new value; player boards sit behind
//! `Arc` so an update copies only the board it touches.

use crate::board::PlayerBoard;
use crate::tiles::TileMultiset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Key prefixes marking positions the backend cannot address
const NON_PERSISTABLE_PREFIXES: [&str; 2] = ["sample:", "local:"];

/// Opaque identifier of a position on the remote engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionKey(pub String);

impl PositionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the backend can load and store this position.
    ///
    /// Sample positions (bundled demos, ad-hoc local boards) carry a
    /// `sample:` or `local:` prefix, or no key at all.
    pub fn is_persistable(&self) -> bool {
        !self.0.is_empty()
            && !NON_PERSISTABLE_PREFIXES
                .iter()
                .any(|prefix| self.0.starts_with(prefix))
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A factory display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factory {
    pub tiles: TileMultiset,
}

impl Factory {
    pub fn new(tiles: TileMultiset) -> Self {
        Self { tiles }
    }
}

/// Shared center pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterPool {
    pub tiles: TileMultiset,
    pub first_player_marker: bool,
}

/// The complete client-side game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Factory displays, addressed by slot index
    pub factories: Vec<Factory>,
    /// Center pool
    pub center: CenterPool,
    /// Player boards in seat order
    pub players: Vec<Arc<PlayerBoard>>,
    /// Seat of the player to move
    pub current_player: usize,
    /// Key addressing this position on the remote engine
    pub position_key: PositionKey,
}

impl GameState {
    /// Start-of-round layout: empty boards, center holding the first-player marker
    pub fn new(factories: Vec<TileMultiset>, player_count: usize, key: PositionKey) -> Self {
        Self {
            factories: factories.into_iter().map(Factory::new).collect(),
            center: CenterPool {
                tiles: TileMultiset::new(),
                first_player_marker: true,
            },
            players: (0..player_count)
                .map(|_| Arc::new(PlayerBoard::new()))
                .collect(),
            current_player: 0,
            position_key: key,
        }
    }

    /// Build from factory notation, e.g. `&["BBYR", "KKTT"]`
    pub fn from_notation(factories: &[&str], player_count: usize, key: &str) -> Self {
        Self::new(
            factories.iter().map(|f| TileMultiset::parse(f)).collect(),
            player_count,
            PositionKey::new(key),
        )
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, index: usize) -> Option<&PlayerBoard> {
        self.players.get(index).map(Arc::as_ref)
    }

    /// Board of the player to move
    pub fn active_player(&self) -> Option<&PlayerBoard> {
        self.player(self.current_player)
    }

    /// Copy-on-write access to one board. Only used on a freshly cloned state.
    pub(crate) fn player_mut(&mut self, index: usize) -> Option<&mut PlayerBoard> {
        self.players.get_mut(index).map(Arc::make_mut)
    }

    pub fn factory(&self, index: usize) -> Option<&Factory> {
        self.factories.get(index)
    }

    /// Total tiles visible on factories and in the center
    pub fn tiles_on_offer(&self) -> usize {
        self.factories.iter().map(|f| f.tiles.len()).sum::<usize>() + self.center.tiles.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileColor;

    #[test]
    fn test_position_key_prefixes() {
        assert!(PositionKey::new("a1b2c3").is_persistable());
        assert!(!PositionKey::new("sample:opening").is_persistable());
        assert!(!PositionKey::new("local:edit").is_persistable());
        assert!(!PositionKey::default().is_persistable());
    }

    #[test]
    fn test_player_mut_copies_only_touched_board() {
        let state = GameState::from_notation(&["BBYR"], 2, "k1");
        let mut next = state.clone();
        next.player_mut(0).unwrap().score = 7;

        assert_eq!(state.player(0).unwrap().score, 0);
        assert_eq!(next.player(0).unwrap().score, 7);
        assert!(Arc::ptr_eq(&state.players[1], &next.players[1]));
        assert!(!Arc::ptr_eq(&state.players[0], &next.players[0]));
    }

    #[test]
    fn test_json_round_trip_keeps_key() {
        let mut state = GameState::from_notation(&["BBYR", "KTTK"], 2, "pos-42");
        state.center.tiles.push(TileColor::Red);
        let json = state.to_json().unwrap();
        assert!(json.contains("\"positionKey\":\"pos-42\""));
        assert_eq!(GameState::from_json(&json).unwrap(), state);
    }
}
