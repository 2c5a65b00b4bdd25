//! Per-player board: pattern lines, wall, and floor line.
//!
//! Scoring and wall tiling are decided by the authoritative engine; this
//! module only holds the shapes and the invariants the client relies on.

use crate::tiles::TileColor;
use serde::{Deserialize, Serialize};

/// Rows (and columns) on a player board
pub const BOARD_SIZE: usize = 5;

/// Pattern line capacity for a row: `row + 1`
pub const fn capacity(row: usize) -> usize {
    row + 1
}

/// A staging row of fixed capacity, single-colored once non-empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternLine {
    pub row: usize,
    pub tiles: Vec<TileColor>,
}

impl PatternLine {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            tiles: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        capacity(self.row)
    }

    /// Current number of tiles
    pub fn fill(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The line's color, if it has any tiles
    pub fn color(&self) -> Option<TileColor> {
        self.tiles.first().copied()
    }

    /// Space left before the nominal capacity (free-form edits may overfill)
    pub fn available_space(&self) -> usize {
        self.capacity().saturating_sub(self.fill())
    }
}

/// 5x5 wall grid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub cells: [[Option<TileColor>; BOARD_SIZE]; BOARD_SIZE],
}

impl Wall {
    pub fn get(&self, row: usize, col: usize) -> Option<TileColor> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    /// Set a cell; returns false if the coordinates are off the grid
    pub fn set(&mut self, row: usize, col: usize, value: Option<TileColor>) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// Item on the floor line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorToken {
    Tile(TileColor),
    FirstPlayerMarker,
}

/// Overflow area; no capacity is enforced client-side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorLine {
    pub tokens: Vec<FloorToken>,
}

impl FloorLine {
    pub fn push_tiles(&mut self, color: TileColor, count: usize) {
        self.tokens
            .extend(std::iter::repeat(FloorToken::Tile(color)).take(count));
    }

    pub fn has_first_player_marker(&self) -> bool {
        self.tokens.contains(&FloorToken::FirstPlayerMarker)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One player's board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoard {
    pub pattern_lines: [PatternLine; BOARD_SIZE],
    pub wall: Wall,
    pub floor_line: FloorLine,
    pub score: u32,
}

impl PlayerBoard {
    /// Empty board with score 0
    pub fn new() -> Self {
        Self {
            pattern_lines: std::array::from_fn(PatternLine::new),
            wall: Wall::default(),
            floor_line: FloorLine::default(),
            score: 0,
        }
    }

    pub fn pattern_line(&self, row: usize) -> Option<&PatternLine> {
        self.pattern_lines.get(row)
    }
}

impl Default for PlayerBoard {
    fn default() -> Self {
        Self::new()
    }
}
