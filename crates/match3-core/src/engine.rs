//! Match resolution: moving items from the board into the container,
//! clearing matched groups and deciding whether the level is won or lost.
//!
//! The engine commits every change before returning. Callers get the
//! resulting events back and replay them however they like.

use crate::actions::GameEvent;
use crate::board::{Board, CellCoord};
use crate::container::{Container, ContainerFullError};
use crate::game::GameError;
use crate::item::{Item, ItemId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What a move did to the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep playing
    Continue,
    /// Board is empty
    Won,
    /// Container filled up without a match
    Lost,
}

/// Result of a committed move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub events: Vec<GameEvent>,
    pub resolution: Resolution,
}

/// The one item that may still be sent back to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub item: ItemId,
    pub origin: CellCoord,
}

/// Board and container for one level, plus undo tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEngine {
    board: Board,
    container: Container,
    last_move: Option<LastMove>,
}

impl MatchEngine {
    pub fn new(board: Board, container: Container) -> Self {
        Self {
            board,
            container,
            last_move: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn last_move(&self) -> Option<LastMove> {
        self.last_move
    }

    /// Move the item at `coord` into the container and resolve the outcome.
    ///
    /// Fails without touching anything if the cell is empty or out of range.
    pub fn move_to_container(&mut self, coord: CellCoord) -> Result<MoveReport, GameError> {
        let item = self.board.free(coord).ok_or(GameError::InvalidCell(coord))?;
        let mut events = Vec::new();

        let staged = item.clone();
        let slot = match self.container.add_item(item) {
            Ok(slot) => slot,
            Err(ContainerFullError { item, capacity }) => {
                debug!(%coord, capacity, "container full, returning item to its cell");
                self.restore(coord, item);
                return Ok(MoveReport {
                    events,
                    resolution: Resolution::Lost,
                });
            }
        };

        debug!(item = %staged.id, item_type = %staged.item_type, slot, "item staged");
        self.last_move = Some(LastMove {
            item: staged.id,
            origin: coord,
        });
        events.push(GameEvent::ItemStaged {
            item: staged,
            from: coord,
            slot,
        });

        let matched = self.clear_matches(&mut events);

        let resolution = if !matched && self.container.is_full() {
            Resolution::Lost
        } else if self.board.is_all_empty() {
            Resolution::Won
        } else {
            Resolution::Continue
        };

        Ok(MoveReport { events, resolution })
    }

    /// Clear every complete group. Returns true if anything was cleared.
    fn clear_matches(&mut self, events: &mut Vec<GameEvent>) -> bool {
        let mut matched = false;

        while let Some(candidate) = self.container.find_triple_candidate() {
            let cleared = self.container.clear_triple(&candidate.items);
            debug!(item_type = %candidate.item_type, count = cleared.len(), "match cleared");

            if let Some(last) = self.last_move {
                if candidate.items.contains(&last.item) {
                    self.last_move = None;
                }
            }

            events.push(GameEvent::TripleCleared {
                item_type: candidate.item_type,
                cleared: cleared.iter().map(|i| i.id).collect(),
            });
            events.push(GameEvent::SlotsRearranged {
                order: self.slot_order(),
            });
            matched = true;
        }

        matched
    }

    /// Send the most recently moved item back to the cell it came from.
    pub fn withdraw(&mut self, id: ItemId) -> Result<Vec<GameEvent>, GameError> {
        let last = self
            .last_move
            .filter(|m| m.item == id)
            .ok_or(GameError::NotWithdrawable(id))?;

        if !self.container.contains(id) || self.board.get_item_at(last.origin).is_some() {
            return Err(GameError::NotWithdrawable(id));
        }

        let item = self
            .container
            .remove_item(id)
            .ok_or(GameError::NotWithdrawable(id))?;
        self.last_move = None;

        debug!(item = %id, to = %last.origin, "item withdrawn");
        let events = vec![
            GameEvent::ItemWithdrawn {
                item: item.clone(),
                to: last.origin,
            },
            GameEvent::SlotsRearranged {
                order: self.slot_order(),
            },
        ];
        self.restore(last.origin, item);

        Ok(events)
    }

    /// Empty the container. Removed items are discarded.
    pub fn reset_container(&mut self) -> Vec<Item> {
        self.last_move = None;
        self.container.reset()
    }

    /// Empty the board
    pub fn clear_board(&mut self) {
        self.last_move = None;
        self.board.clear();
    }

    fn restore(&mut self, coord: CellCoord, item: Item) {
        if let Err(item) = self.board.place(coord, item) {
            warn!(item = %item.id, %coord, "could not return item to the board");
        }
    }

    fn slot_order(&self) -> Vec<ItemId> {
        self.container.items().iter().map(|i| i.id).collect()
    }
}
