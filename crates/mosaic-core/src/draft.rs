//! Draft construction: turning a drag from a source onto a pattern line
//! into a candidate `Move`, and predicting the board it produces.
//!
//! The result is a prediction. The authoritative engine may still reject a
//! move that passes here, e.g. when the local view is stale.

use crate::actions::{DraftSource, Move};
use crate::board::{capacity, FloorToken, BOARD_SIZE};
use crate::game::GameState;
use crate::tiles::{TileColor, TileMultiset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a draft could not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MoveRejection {
    #[error("Source is missing or empty")]
    SourceNotFound,

    #[error("That color is not available at the source")]
    TileNotAvailable,

    #[error("Pattern line already holds another color")]
    ColorConflict,

    #[error("Pattern line is full")]
    LineFull,

    #[error("No such pattern line")]
    InvalidRow,

    #[error("No player to move")]
    NoActivePlayer,
}

/// Split `count` tiles between a line with `available_space` and the floor
pub fn distribute(count: usize, available_space: usize) -> (usize, usize) {
    let to_line = count.min(available_space);
    (to_line, count - to_line)
}

fn source_tiles(state: &GameState, source: DraftSource) -> Option<&TileMultiset> {
    match source {
        DraftSource::Factory(index) => state.factory(index).map(|f| &f.tiles),
        DraftSource::Center => Some(&state.center.tiles),
    }
}

/// Build a draft for the player to move.
pub fn construct(
    state: &GameState,
    source: DraftSource,
    color: TileColor,
    row: usize,
) -> Result<Move, MoveRejection> {
    let tiles = source_tiles(state, source)
        .filter(|tiles| !tiles.is_empty())
        .ok_or(MoveRejection::SourceNotFound)?;

    if !tiles.contains(color) {
        return Err(MoveRejection::TileNotAvailable);
    }
    let count = tiles.count(color);

    if row >= BOARD_SIZE {
        return Err(MoveRejection::InvalidRow);
    }
    let line = state
        .active_player()
        .ok_or(MoveRejection::NoActivePlayer)?
        .pattern_line(row)
        .ok_or(MoveRejection::InvalidRow)?;

    // A full line is reported as full whatever its color. Free-form edits
    // can overfill a line, so fill may exceed capacity.
    let available_space = capacity(row).saturating_sub(line.fill());
    if available_space == 0 {
        return Err(MoveRejection::LineFull);
    }

    if line.color().is_some_and(|existing| existing != color) {
        return Err(MoveRejection::ColorConflict);
    }

    let (to_pattern_line, to_floor_line) = distribute(count, available_space);
    Ok(Move {
        source,
        color,
        row,
        to_pattern_line,
        to_floor_line,
    })
}

/// Apply a draft to a copy of `state` for immediate feedback.
///
/// Factory leftovers go to the center; taking from the center while the
/// first-player marker is there moves the marker to the floor. The position
/// key is left alone; only the engine hands out new keys.
pub fn predict(state: &GameState, mv: &Move) -> GameState {
    let mut next = state.clone();
    let player = next.current_player;

    let mut took_marker = false;
    match mv.source {
        DraftSource::Factory(index) => {
            if let Some(factory) = next.factories.get_mut(index) {
                let (_, rest) = factory.tiles.take_all(mv.color);
                next.center.tiles.extend_from(&rest);
                factory.tiles.clear();
            }
        }
        DraftSource::Center => {
            let (_, rest) = next.center.tiles.take_all(mv.color);
            next.center.tiles = rest;
            took_marker = std::mem::take(&mut next.center.first_player_marker);
        }
    }

    if let Some(board) = next.player_mut(player) {
        if let Some(line) = board.pattern_lines.get_mut(mv.row) {
            line.tiles
                .extend(std::iter::repeat(mv.color).take(mv.to_pattern_line));
        }
        if took_marker {
            board.floor_line.tokens.push(FloorToken::FirstPlayerMarker);
        }
        board.floor_line.push_tiles(mv.color, mv.to_floor_line);
    }

    next
}
