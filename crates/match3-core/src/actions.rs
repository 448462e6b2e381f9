//! Intents a presentation layer can send, and the notifications it gets back.
//!
//! Actions flow in, events flow out. The engine never reads anything from
//! an event consumer.

use crate::board::CellCoord;
use crate::container::SlotIndex;
use crate::game::GameState;
use crate::item::{Item, ItemId, ItemType};
use serde::{Deserialize, Serialize};

/// Everything a caller can ask a session to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Level Lifecycle ====================
    /// Build a fresh board and container and start playing. Missing
    /// dimensions come from the session's config.
    LoadLevel {
        #[serde(default)]
        width: Option<usize>,
        #[serde(default)]
        height: Option<usize>,
        item_types: Vec<ItemType>,
    },
    /// Tear the level down and go back to the menu
    ReturnToMenu,

    // ==================== Play ====================
    /// Move the item at a board cell into the container
    RequestMove(CellCoord),
    /// Send the most recently moved item back to its cell
    Withdraw(ItemId),
    /// Pause or resume
    SetPaused(bool),
    /// Let the level timer run
    AdvanceClock { millis: u64 },
    /// End the level from outside (budget expired elsewhere, player quit)
    SignalTerminal,

    // ==================== Teardown ====================
    ResetContainer,
    ClearBoard,
}

/// Notifications emitted as state changes are committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Session moved to a new state
    StateChanged { state: GameState },

    /// A level was built
    LevelLoaded {
        width: usize,
        height: usize,
        capacity: usize,
        match_size: usize,
    },

    /// An item left the board and landed in a container slot
    ItemStaged {
        item: Item,
        from: CellCoord,
        slot: SlotIndex,
    },

    /// A group of same-typed items was removed from the container
    TripleCleared {
        item_type: ItemType,
        cleared: Vec<ItemId>,
    },

    /// Container slots after compaction, slot 0 first
    SlotsRearranged { order: Vec<ItemId> },

    /// An item went back from the container to the board
    ItemWithdrawn { item: Item, to: CellCoord },

    /// Board emptied
    MatchWon,

    /// Container filled up without a match
    MatchLost,

    /// Move budget changed
    MovesRemaining { remaining: u32 },

    /// Move or time budget ran out, or the level was ended externally
    ConditionExpired,

    /// Container emptied by a reset
    ContainerReset { removed: Vec<ItemId> },

    /// Board emptied by teardown
    BoardCleared,
}

impl GameEvent {
    /// Whether this event ends the current level
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GameEvent::MatchWon | GameEvent::MatchLost | GameEvent::ConditionExpired
        )
    }
}
