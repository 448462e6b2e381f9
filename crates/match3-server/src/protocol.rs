//! WebSocket protocol messages for the match-3 server.

use match3_core::{BotDifficulty, CellCoord, GameAction, GameEvent, SessionSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Submit a game action
    Action { action: GameAction },

    /// Request the current session view
    Snapshot,

    /// Ask for a suggested move
    Hint { difficulty: BotDifficulty },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the connection's session ID
    Welcome { session_id: Uuid },

    /// Result of a submitted action
    ActionResult {
        success: bool,
        events: Vec<GameEvent>,
        error: Option<String>,
    },

    /// Events not caused by a client action (level clock)
    Events { events: Vec<GameEvent> },

    /// Current session view
    Snapshot { snapshot: SessionSnapshot },

    /// Suggested move, if any
    Hint { cell: Option<CellCoord> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}
