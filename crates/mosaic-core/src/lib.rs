//! Mosaic - client core for a tile-drafting board game
//!
//! This crate holds the pure, I/O-free half of the Mosaic client:
//! - The game-state model (factories, center pool, player boards)
//! - Fingerprinting for cheap change detection
//! - Draft construction and local prediction
//! - Edit mode: selection, clipboard, and free-form edits
//!
//! # Architecture
//!
//! Nothing here mutates a state in place. Every operation takes a
//! `&GameState` and hands back a new value, which the owner (the sync
//! store in `mosaic-sync`, or a browser host through the `wasm` feature)
//! installs in one step.
//!
//! # Modules
//!
//! - [`tiles`]: Tile colors and the tile multiset
//! - [`board`]: Pattern lines, wall, floor line, player board
//! - [`game`]: `GameState` and position keys
//! - [`actions`]: Candidate moves and selection targets
//! - [`fingerprint`]: Change-detection digest
//! - [`draft`]: Move construction and prediction
//! - [`edit`]: Edit-mode overlay

pub mod actions;
pub mod board;
pub mod draft;
pub mod edit;
pub mod fingerprint;
pub mod game;
pub mod tiles;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{DraftSource, Move, SelectionElement};
pub use board::{capacity, FloorLine, FloorToken, PatternLine, PlayerBoard, Wall, BOARD_SIZE};
pub use draft::{construct, distribute, predict, MoveRejection};
pub use edit::{ClipboardContents, ClipboardEntry, EditOutcome, EditOverlay};
pub use fingerprint::{fingerprint, Fingerprint};
pub use game::{CenterPool, Factory, GameState, PositionKey};
pub use tiles::{TileColor, TileMultiset, TILE_COLORS};
