//! WebAssembly bindings for the Mosaic client core.
//!
//! The browser host keeps the store; these functions expose the pure
//! operations as JSON-in / JSON-out calls.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::{DraftSource, Move};
#[cfg(feature = "wasm")]
use crate::draft::{construct, predict};
#[cfg(feature = "wasm")]
use crate::fingerprint::fingerprint;
#[cfg(feature = "wasm")]
use crate::game::GameState;
#[cfg(feature = "wasm")]
use crate::tiles::TileColor;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[cfg(feature = "wasm")]
fn parse_state(state_json: &str) -> Result<GameState, JsValue> {
    GameState::from_json(state_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid game state: {}", e)))
}

/// Fingerprint of a state, as 16 hex digits
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = fingerprintState)]
pub fn fingerprint_state(state_json: &str) -> Result<String, JsValue> {
    Ok(fingerprint(&parse_state(state_json)?).to_string())
}

/// Build a draft. `factory` < 0 means the center pool.
/// Returns the move JSON, or rejects with the reason.
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = constructMove)]
pub fn construct_move(state_json: &str, factory: i32, color: char, row: usize) -> Result<String, JsValue> {
    let state = parse_state(state_json)?;
    let source = if factory < 0 {
        DraftSource::Center
    } else {
        DraftSource::Factory(factory as usize)
    };
    let color = TileColor::from_symbol(color)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown tile color: {}", color)))?;

    let mv = construct(&state, source, color, row).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&mv).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Apply a move JSON to a state JSON for immediate display
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = predictMove)]
pub fn predict_move(state_json: &str, move_json: &str) -> Result<String, JsValue> {
    let state = parse_state(state_json)?;
    let mv: Move = serde_json::from_str(move_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid move JSON: {}", e)))?;
    predict(&state, &mv)
        .to_json()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
