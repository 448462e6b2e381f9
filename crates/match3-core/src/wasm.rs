//! WebAssembly bindings for the match-3 engine.
//!
//! This module exposes a session to JavaScript through wasm-bindgen. All
//! structured values cross the boundary as JSON strings.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::GameAction;
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::config::LevelConfig;
#[cfg(feature = "wasm")]
use crate::game::GameSession;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed session wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmSession {
    session: GameSession,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmSession {
    /// Create a session from a JSON config (empty string for defaults),
    /// already moved to the main menu
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSession, JsValue> {
        let config = if config_json.trim().is_empty() {
            LevelConfig::default()
        } else {
            LevelConfig::from_json(config_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };

        let mut session = GameSession::new(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        session
            .init()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmSession { session })
    }

    /// Get a snapshot of the session as JSON
    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> String {
        serde_json::to_string(&self.session.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Current state name
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.session.state()).unwrap_or_else(|_| "\"Unknown\"".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.session.apply_action(action) {
            Ok(events) => {
                Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string()))
            }
            Err(e) => Err(JsValue::from_str(&format!("Action rejected: {}", e))),
        }
    }

    /// Check if the level is over
    #[wasm_bindgen(js_name = isOver)]
    pub fn is_over(&self) -> bool {
        self.session.is_over()
    }

    /// Suggest a cell to move as JSON, or "null"
    /// difficulty: "Easy" or "Medium"
    #[wasm_bindgen(js_name = getHint)]
    pub fn get_hint(&self, difficulty: &str) -> String {
        let diff = match difficulty {
            "Easy" => BotDifficulty::Easy,
            _ => BotDifficulty::Medium,
        };

        let mut bot = Bot::new(diff);
        match bot.choose_move(&self.session) {
            Some(cell) => serde_json::to_string(&cell).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }
}
