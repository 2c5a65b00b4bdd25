//! Cheap change detection for fetched game states.
//!
//! A fingerprint covers factory contents and player scores only. Floor
//! lines, walls, pattern lines, and the center are not mixed in, so two
//! states that differ only there compare equal. Callers must not treat a
//! matching fingerprint as full equality.

use crate::game::GameState;
use serde::{Deserialize, Serialize};
use std::fmt;

const SEED: u64 = 0xA2F1_7C3D_5E0B_9146;
const FACTORY_TAG: u64 = 0xFAC7_0000;
const SCORE_TAG: u64 = 0x5C0E_0000;

/// Digest of the covered fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn mix(h: &mut u64, x: u64) {
    *h = splitmix64(*h ^ x);
}

/// Fingerprint a state. Factory order matters, tile order inside a factory does not.
pub fn fingerprint(state: &GameState) -> Fingerprint {
    let mut h = SEED;

    mix(&mut h, FACTORY_TAG | state.factories.len() as u64);
    for factory in &state.factories {
        let packed = factory
            .tiles
            .counts()
            .iter()
            .fold(0u64, |acc, &c| (acc << 8) | c as u64);
        mix(&mut h, packed);
    }

    mix(&mut h, SCORE_TAG | state.players.len() as u64);
    for player in &state.players {
        mix(&mut h, player.score as u64);
    }

    Fingerprint(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::FloorToken;
    use crate::tiles::{TileColor, TileMultiset};
    use std::sync::Arc;

    fn base() -> GameState {
        GameState::from_notation(&["BBYR", "KKTT", "RRRY"], 2, "pos-1")
    }

    #[test]
    fn test_deterministic_for_equal_states() {
        assert_eq!(fingerprint(&base()), fingerprint(&base()));
    }

    #[test]
    fn test_tile_order_within_factory_is_ignored() {
        let mut shuffled = base();
        shuffled.factories[0].tiles = TileMultiset::parse("RYBB");
        assert_eq!(fingerprint(&base()), fingerprint(&shuffled));
    }

    #[test]
    fn test_factory_and_score_changes_are_detected() {
        let mut drained = base();
        drained.factories[1].tiles.clear();
        assert_ne!(fingerprint(&base()), fingerprint(&drained));

        let mut scored = base();
        Arc::make_mut(&mut scored.players[1]).score = 3;
        assert_ne!(fingerprint(&base()), fingerprint(&scored));
    }

    #[test]
    fn test_floor_line_is_a_blind_spot() {
        let mut floored = base();
        let board = Arc::make_mut(&mut floored.players[0]);
        board.floor_line.tokens.push(FloorToken::Tile(TileColor::Red));
        board.floor_line.tokens.push(FloorToken::FirstPlayerMarker);
        assert_eq!(fingerprint(&base()), fingerprint(&floored));
    }

    #[test]
    fn test_wall_pattern_lines_and_center_are_not_covered() {
        let mut edited = base();
        let board = Arc::make_mut(&mut edited.players[0]);
        board.wall.set(0, 0, Some(TileColor::Blue));
        board.pattern_lines[2].tiles.push(TileColor::Red);
        edited.center.tiles.push(TileColor::Teal);
        edited.position_key = crate::game::PositionKey::new("pos-2");
        assert_eq!(fingerprint(&base()), fingerprint(&edited));
    }
}
