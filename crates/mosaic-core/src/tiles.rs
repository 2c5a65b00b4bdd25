//! Tile colors and the unordered tile bag.
//!
//! This module provides the leaf value types every other module builds on:
//! - `TileColor`: the fixed five-color palette
//! - `TileMultiset`: a bag of tiles where only per-color counts matter
//!
//! Multisets keep insertion order for display, but equality and hashing
//! look at counts only, so `[B,Y]` and `[Y,B]` are the same bag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of colors in the palette
pub const TILE_COLORS: usize = 5;

/// Tile colors (order fixed; it is the index used by count arrays)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileColor {
    Blue,
    Yellow,
    Red,
    Black,
    Teal,
}

impl TileColor {
    /// All colors in index order
    pub const ALL: [TileColor; TILE_COLORS] = [
        TileColor::Blue,
        TileColor::Yellow,
        TileColor::Red,
        TileColor::Black,
        TileColor::Teal,
    ];

    /// Position of this color in count arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Single-character notation: B Y R K T
    pub const fn symbol(self) -> char {
        match self {
            TileColor::Blue => 'B',
            TileColor::Yellow => 'Y',
            TileColor::Red => 'R',
            TileColor::Black => 'K',
            TileColor::Teal => 'T',
        }
    }

    /// Parse the single-character notation (case-insensitive)
    pub fn from_symbol(c: char) -> Option<TileColor> {
        match c.to_ascii_uppercase() {
            'B' => Some(TileColor::Blue),
            'Y' => Some(TileColor::Yellow),
            'R' => Some(TileColor::Red),
            'K' => Some(TileColor::Black),
            'T' => Some(TileColor::Teal),
            _ => None,
        }
    }
}

impl fmt::Display for TileColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An unordered bag of tiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileMultiset {
    tiles: Vec<TileColor>,
}

impl TileMultiset {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a bag from notation like `"BBYR"`. Unknown characters are skipped.
    pub fn parse(notation: &str) -> Self {
        notation.chars().filter_map(TileColor::from_symbol).collect()
    }

    /// Total number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of tiles of one color
    pub fn count(&self, color: TileColor) -> usize {
        self.iter().filter(|&t| t == color).count()
    }

    pub fn contains(&self, color: TileColor) -> bool {
        self.tiles.contains(&color)
    }

    /// Per-color counts, indexed by `TileColor::index`
    pub fn counts(&self) -> [u8; TILE_COLORS] {
        let mut counts = [0u8; TILE_COLORS];
        for tile in &self.tiles {
            counts[tile.index()] = counts[tile.index()].saturating_add(1);
        }
        counts
    }

    /// Add one tile
    pub fn push(&mut self, color: TileColor) {
        self.tiles.push(color);
    }

    /// Add every tile of another bag
    pub fn extend_from(&mut self, other: &TileMultiset) {
        self.tiles.extend_from_slice(&other.tiles);
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Split into (tiles of `color`, everything else). Drafting always takes the whole first half.
    pub fn take_all(&self, color: TileColor) -> (usize, TileMultiset) {
        let taken = self.count(color);
        let rest = self.iter().filter(|&t| t != color).collect();
        (taken, rest)
    }

    pub fn iter(&self) -> impl Iterator<Item = TileColor> + '_ {
        self.tiles.iter().copied()
    }
}

impl PartialEq for TileMultiset {
    fn eq(&self, other: &Self) -> bool {
        self.counts() == other.counts()
    }
}

impl Eq for TileMultiset {}

impl FromIterator<TileColor> for TileMultiset {
    fn from_iter<I: IntoIterator<Item = TileColor>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for TileMultiset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tile in &self.tiles {
            write!(f, "{}", tile.symbol())?;
        }
        Ok(())
    }
}
