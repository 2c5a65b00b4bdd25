//! Edit mode: selection, clipboard, and free-form board edits.
//!
//! Edits never touch the state they are given. Each operation returns an
//! `EditOutcome`; on `Mutated` the caller installs the new state and
//! persists it. Outside edit mode every operation is `Unchanged`.

use crate::actions::SelectionElement;
use crate::board::BOARD_SIZE;
use crate::game::GameState;
use crate::tiles::{TileColor, TileMultiset};
use serde::{Deserialize, Serialize};

/// Contents of a selected element at copy time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardContents {
    Tiles(TileMultiset),
    Line(Vec<TileColor>),
    Cell(Option<TileColor>),
}

/// One copied element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub source: SelectionElement,
    pub contents: ClipboardContents,
}

/// Result of an edit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing changed (not in edit mode, empty selection, no-op edit)
    Unchanged,
    /// A new state to install and persist
    Mutated(GameState),
    /// Refused, with a message for the status line
    Rejected(String),
}

/// Local selection and clipboard layered over the game state
#[derive(Debug, Clone, Default)]
pub struct EditOverlay {
    edit_mode: bool,
    selection: Vec<SelectionElement>,
    clipboard: Vec<ClipboardEntry>,
}

fn snapshot(state: &GameState, element: &SelectionElement) -> Option<ClipboardContents> {
    match *element {
        SelectionElement::FactoryTile { factory } => state
            .factory(factory)
            .map(|f| ClipboardContents::Tiles(f.tiles.clone())),
        SelectionElement::PatternLineCell { player, row } => state
            .player(player)
            .and_then(|b| b.pattern_line(row))
            .map(|line| ClipboardContents::Line(line.tiles.clone())),
        SelectionElement::WallCell { player, row, col } => state
            .player(player)
            .map(|b| ClipboardContents::Cell(b.wall.get(row, col))),
    }
}

/// Apply `edit` to each item on a copy of `state`; `Unchanged` if nothing was touched.
fn edit_each<T, F>(state: &GameState, items: &[T], mut edit: F) -> EditOutcome
where
    F: FnMut(&mut GameState, &T) -> bool,
{
    let mut next = state.clone();
    let mut changed = false;
    for item in items {
        changed |= edit(&mut next, item);
    }
    if changed {
        EditOutcome::Mutated(next)
    } else {
        EditOutcome::Unchanged
    }
}

impl EditOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Toggle edit mode. Leaving it drops the selection; the clipboard survives.
    pub fn set_edit_mode(&mut self, enabled: bool) {
        self.edit_mode = enabled;
        if !enabled {
            self.selection.clear();
        }
    }

    pub fn selection(&self) -> &[SelectionElement] {
        &self.selection
    }

    pub fn clipboard(&self) -> &[ClipboardEntry] {
        &self.clipboard
    }

    /// Select an element. Additive selection toggles membership.
    pub fn select(&mut self, element: SelectionElement, additive: bool) {
        if !self.edit_mode {
            return;
        }
        if !additive {
            self.selection = vec![element];
        } else if let Some(pos) = self.selection.iter().position(|e| *e == element) {
            self.selection.remove(pos);
        } else {
            self.selection.push(element);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Paint every selected element with `color`.
    ///
    /// Factories and pattern lines get the tile appended (no capacity check);
    /// wall cells are only filled when empty.
    pub fn apply_color(&self, state: &GameState, color: TileColor) -> EditOutcome {
        if !self.edit_mode {
            return EditOutcome::Unchanged;
        }
        edit_each(state, &self.selection, |next, element| match *element {
            SelectionElement::FactoryTile { factory } => match next.factories.get_mut(factory) {
                Some(f) => {
                    f.tiles.push(color);
                    true
                }
                None => false,
            },
            SelectionElement::PatternLineCell { player, row } => next
                .player_mut(player)
                .and_then(|b| b.pattern_lines.get_mut(row))
                .map(|line| line.tiles.push(color))
                .is_some(),
            SelectionElement::WallCell { player, row, col } => {
                let empty = next
                    .player(player)
                    .is_some_and(|b| row < BOARD_SIZE && col < BOARD_SIZE && b.wall.get(row, col).is_none());
                empty
                    && next
                        .player_mut(player)
                        .is_some_and(|b| b.wall.set(row, col, Some(color)))
            }
        })
    }

    /// Clear every selected element.
    pub fn remove_selected(&self, state: &GameState) -> EditOutcome {
        if !self.edit_mode {
            return EditOutcome::Unchanged;
        }
        edit_each(state, &self.selection, |next, element| match *element {
            SelectionElement::FactoryTile { factory } => {
                match next.factories.get_mut(factory) {
                    Some(f) if !f.tiles.is_empty() => {
                        f.tiles.clear();
                        true
                    }
                    _ => false,
                }
            }
            SelectionElement::PatternLineCell { player, row } => {
                let filled = next
                    .player(player)
                    .and_then(|b| b.pattern_line(row))
                    .is_some_and(|line| !line.is_empty());
                filled
                    && next
                        .player_mut(player)
                        .and_then(|b| b.pattern_lines.get_mut(row))
                        .map(|line| line.tiles.clear())
                        .is_some()
            }
            SelectionElement::WallCell { player, row, col } => {
                let filled = next
                    .player(player)
                    .is_some_and(|b| b.wall.get(row, col).is_some());
                filled
                    && next
                        .player_mut(player)
                        .is_some_and(|b| b.wall.set(row, col, None))
            }
        })
    }

    /// Snapshot the selection into the clipboard. Returns the number of entries copied.
    pub fn copy_selection(&mut self, state: &GameState) -> usize {
        if !self.edit_mode || self.selection.is_empty() {
            return 0;
        }
        self.clipboard = self
            .selection
            .iter()
            .filter_map(|element| {
                snapshot(state, element).map(|contents| ClipboardEntry {
                    source: *element,
                    contents,
                })
            })
            .collect();
        self.clipboard.len()
    }

    /// Paste the clipboard onto the single selected element, replacing its contents.
    ///
    /// Needs exactly one selected target and exactly one compatible
    /// clipboard entry; anything else is refused with a message.
    pub fn paste_into(&self, state: &GameState) -> EditOutcome {
        if !self.edit_mode {
            return EditOutcome::Unchanged;
        }
        let target = match self.selection.as_slice() {
            [target] => *target,
            _ => {
                return EditOutcome::Rejected(
                    "Select exactly one target to paste into".to_string(),
                )
            }
        };
        let entry = match self.clipboard.as_slice() {
            [] => return EditOutcome::Rejected("Clipboard is empty".to_string()),
            [entry] => entry,
            many => {
                return EditOutcome::Rejected(format!(
                    "Clipboard holds {} items; paste needs exactly one",
                    many.len()
                ))
            }
        };
        if !target.accepts(&entry.source) {
            return EditOutcome::Rejected(
                "Clipboard does not match the selected target".to_string(),
            );
        }

        edit_each(state, &[target], |next, target| {
            paste_one(next, target, &entry.contents)
        })
    }
}

fn paste_one(next: &mut GameState, target: &SelectionElement, contents: &ClipboardContents) -> bool {
    match (*target, contents) {
        (SelectionElement::FactoryTile { factory }, ClipboardContents::Tiles(tiles)) => {
            match next.factories.get_mut(factory) {
                Some(f) if f.tiles != *tiles => {
                    f.tiles = tiles.clone();
                    true
                }
                _ => false,
            }
        }
        (SelectionElement::PatternLineCell { player, row }, ClipboardContents::Line(tiles)) => {
            let differs = next
                .player(player)
                .and_then(|b| b.pattern_line(row))
                .is_some_and(|line| line.tiles != *tiles);
            differs
                && next
                    .player_mut(player)
                    .and_then(|b| b.pattern_lines.get_mut(row))
                    .map(|line| line.tiles = tiles.clone())
                    .is_some()
        }
        (SelectionElement::WallCell { player, row, col }, ClipboardContents::Cell(cell)) => {
            let differs = next
                .player(player)
                .is_some_and(|b| row < BOARD_SIZE && col < BOARD_SIZE && b.wall.get(row, col) != *cell);
            differs
                && next
                    .player_mut(player)
                    .is_some_and(|b| b.wall.set(row, col, *cell))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const F0: SelectionElement = SelectionElement::FactoryTile { factory: 0 };
    const F1: SelectionElement = SelectionElement::FactoryTile { factory: 1 };
    const LINE: SelectionElement = SelectionElement::PatternLineCell { player: 0, row: 0 };
    const CELL: SelectionElement = SelectionElement::WallCell {
        player: 1,
        row: 2,
        col: 3,
    };

    fn state() -> GameState {
        GameState::from_notation(&["BBYR", "KT"], 2, "pos-9")
    }

    fn editing() -> EditOverlay {
        let mut overlay = EditOverlay::new();
        overlay.set_edit_mode(true);
        overlay
    }

    fn mutated(outcome: EditOutcome) -> GameState {
        match outcome {
            EditOutcome::Mutated(state) => state,
            other => panic!("expected a mutation, got {:?}", other),
        }
    }

    #[test]
    fn test_everything_is_inert_outside_edit_mode() {
        let mut overlay = EditOverlay::new();
        overlay.select(F0, false);
        assert!(overlay.selection().is_empty());
        assert_eq!(overlay.apply_color(&state(), TileColor::Red), EditOutcome::Unchanged);
        assert_eq!(overlay.remove_selected(&state()), EditOutcome::Unchanged);
        assert_eq!(overlay.copy_selection(&state()), 0);
        assert_eq!(overlay.paste_into(&state()), EditOutcome::Unchanged);
    }

    #[test]
    fn test_additive_select_toggles() {
        let mut overlay = editing();
        overlay.select(F0, false);
        overlay.select(LINE, true);
        assert_eq!(overlay.selection(), &[F0, LINE]);
        overlay.select(F0, true);
        assert_eq!(overlay.selection(), &[LINE]);
        overlay.select(CELL, false);
        assert_eq!(overlay.selection(), &[CELL]);

        overlay.set_edit_mode(false);
        assert!(overlay.selection().is_empty());
    }

    #[test]
    fn test_apply_color_paints_every_selected_element() {
        let mut overlay = editing();
        overlay.select(F1, false);
        overlay.select(LINE, true);
        overlay.select(CELL, true);

        let original = state();
        let next = mutated(overlay.apply_color(&original, TileColor::Red));
        assert_eq!(next.factories[1].tiles, TileMultiset::parse("KTR"));
        assert_eq!(next.player(1).unwrap().wall.get(2, 3), Some(TileColor::Red));
        assert_eq!(original.factories[1].tiles, TileMultiset::parse("KT"));
        assert_eq!(next.position_key, original.position_key);

        // no capacity check on the free-form path
        let again = mutated(overlay.apply_color(&next, TileColor::Red));
        assert_eq!(again.player(0).unwrap().pattern_lines[0].fill(), 2);
        // occupied wall cells keep their color
        assert_eq!(again.player(1).unwrap().wall.get(2, 3), Some(TileColor::Red));
    }

    #[test]
    fn test_apply_color_leaves_filled_wall_cell() {
        let mut overlay = editing();
        overlay.select(CELL, false);
        let painted = mutated(overlay.apply_color(&state(), TileColor::Teal));
        assert_eq!(overlay.apply_color(&painted, TileColor::Blue), EditOutcome::Unchanged);
    }

    #[test]
    fn test_remove_selected_clears() {
        let mut overlay = editing();
        overlay.select(F0, false);
        overlay.select(CELL, true);
        let painted = mutated(overlay.apply_color(&state(), TileColor::Black));

        let cleared = mutated(overlay.remove_selected(&painted));
        assert!(cleared.factories[0].tiles.is_empty());
        assert_eq!(cleared.player(1).unwrap().wall.get(2, 3), None);
        assert_eq!(overlay.remove_selected(&cleared), EditOutcome::Unchanged);
    }

    #[test]
    fn test_copy_then_paste_factory() {
        let mut overlay = editing();
        overlay.select(F0, false);
        assert_eq!(overlay.copy_selection(&state()), 1);
        assert_eq!(
            overlay.clipboard(),
            &[ClipboardEntry {
                source: F0,
                contents: ClipboardContents::Tiles(TileMultiset::parse("BBYR")),
            }]
        );

        overlay.select(F1, false);
        let next = mutated(overlay.paste_into(&state()));
        assert_eq!(next.factories[1].tiles, TileMultiset::parse("BBYR"));
        assert_eq!(next.factories[0].tiles, TileMultiset::parse("BBYR"));
    }

    #[test]
    fn test_paste_needs_single_target_and_single_entry() {
        let mut overlay = editing();
        overlay.select(F0, false);
        overlay.select(F1, true);
        assert_eq!(overlay.copy_selection(&state()), 2);

        // two targets
        assert!(matches!(overlay.paste_into(&state()), EditOutcome::Rejected(_)));

        // one compatible target, but two clipboard entries
        overlay.select(F1, false);
        assert!(matches!(overlay.paste_into(&state()), EditOutcome::Rejected(_)));
    }

    #[test]
    fn test_paste_rejects_incompatible_target() {
        let mut overlay = editing();
        overlay.select(F0, false);
        overlay.copy_selection(&state());
        overlay.select(LINE, false);
        assert!(matches!(overlay.paste_into(&state()), EditOutcome::Rejected(_)));

        let empty = editing();
        assert!(matches!(empty.paste_into(&state()), EditOutcome::Rejected(_)));
    }

    #[test]
    fn test_paste_pattern_line_within_same_player() {
        let mut overlay = editing();
        overlay.select(LINE, false);
        let painted = mutated(overlay.apply_color(&state(), TileColor::Yellow));
        overlay.copy_selection(&painted);

        overlay.select(SelectionElement::PatternLineCell { player: 0, row: 3 }, false);
        let pasted = mutated(overlay.paste_into(&painted));
        assert_eq!(
            pasted.player(0).unwrap().pattern_lines[3].tiles,
            vec![TileColor::Yellow]
        );

        overlay.select(SelectionElement::PatternLineCell { player: 1, row: 3 }, false);
        assert!(matches!(overlay.paste_into(&painted), EditOutcome::Rejected(_)));
    }
}
