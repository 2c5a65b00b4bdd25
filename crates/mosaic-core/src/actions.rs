//! Candidate moves and edit-mode selection targets.

use crate::tiles::TileColor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a draft takes tiles from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftSource {
    /// A factory display by slot index
    Factory(usize),
    /// The shared center pool
    Center,
}

impl fmt::Display for DraftSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftSource::Factory(i) => write!(f, "factory {}", i),
            DraftSource::Center => write!(f, "center"),
        }
    }
}

/// A locally constructed draft, waiting for the authoritative engine.
///
/// `to_pattern_line + to_floor_line` always equals the number of `color`
/// tiles that were at `source` when the move was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub source: DraftSource,
    pub color: TileColor,
    pub row: usize,
    pub to_pattern_line: usize,
    pub to_floor_line: usize,
}

impl Move {
    /// Total tiles taken from the source
    pub fn taken(&self) -> usize {
        self.to_pattern_line + self.to_floor_line
    }
}

/// Something that can be selected in edit mode.
///
/// Identity is the variant plus its indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionElement {
    FactoryTile { factory: usize },
    PatternLineCell { player: usize, row: usize },
    WallCell { player: usize, row: usize, col: usize },
}

impl SelectionElement {
    /// Paste compatibility: factories take factories, pattern lines take
    /// pattern lines of the same player, wall cells take wall cells.
    pub fn accepts(&self, source: &SelectionElement) -> bool {
        match (self, source) {
            (SelectionElement::FactoryTile { .. }, SelectionElement::FactoryTile { .. }) => true,
            (
                SelectionElement::PatternLineCell { player: target, .. },
                SelectionElement::PatternLineCell { player: origin, .. },
            ) => target == origin,
            (SelectionElement::WallCell { .. }, SelectionElement::WallCell { .. }) => true,
            _ => false,
        }
    }
}
