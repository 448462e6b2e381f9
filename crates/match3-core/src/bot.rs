//! Move suggestions, used for hints and autoplay.
//!
//! - Easy: any occupied cell
//! - Medium: finish a pending match, then grow an existing group, and never
//!   fill the last container slot with an item that does not match

use crate::board::{Cell, CellCoord};
use crate::game::{GameSession, GameState};
use crate::item::ItemType;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
}

/// A bot that picks board cells to move
pub struct Bot {
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(difficulty: BotDifficulty) -> Self {
        Self {
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose a cell to move, or `None` if no move is possible right now
    pub fn choose_move(&mut self, session: &GameSession) -> Option<CellCoord> {
        if session.state() != GameState::Started {
            return None;
        }
        let board = session.board()?;
        let candidates: Vec<&Cell> = board.occupied_cells().collect();
        if candidates.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(&candidates),
            BotDifficulty::Medium => self.choose_medium(session, &candidates),
        }
    }

    /// Easy: any occupied cell
    fn choose_easy(&mut self, cells: &[&Cell]) -> Option<CellCoord> {
        cells.choose(&mut self.rng).map(|c| c.coord)
    }

    /// Medium: best-scoring cell, ties broken at random
    fn choose_medium(&mut self, session: &GameSession, cells: &[&Cell]) -> Option<CellCoord> {
        let container = session.container()?;

        let mut staged: HashMap<&ItemType, usize> = HashMap::new();
        for item in container.items() {
            *staged.entry(&item.item_type).or_default() += 1;
        }
        let last_slot = container.len() + 1 >= container.capacity();

        let score = |cell: &Cell| -> i32 {
            let Some(item) = cell.item() else {
                return i32::MIN;
            };
            let count = staged.get(&item.item_type).copied().unwrap_or(0);
            if count + 1 >= container.match_size() {
                3
            } else if last_slot {
                // Would fill the container without a match
                -1
            } else if count > 0 {
                2
            } else {
                1
            }
        };

        let best = cells.iter().map(|c| score(*c)).max()?;
        let best_cells: Vec<CellCoord> = cells
            .iter()
            .filter(|c| score(**c) == best)
            .map(|c| c.coord)
            .collect();
        best_cells.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::SequenceFill;
    use crate::config::{LevelConfig, LevelMode};
    use crate::item::ItemTypeRegistry;

    fn session(types: &[&str], capacity: usize) -> GameSession {
        let config = LevelConfig {
            container_capacity: capacity,
            level_mode: LevelMode::Unlimited,
            ..LevelConfig::default()
        };
        let mut session = GameSession::new(config).unwrap();
        session.init().unwrap();
        let pool = ItemTypeRegistry::from_names(types.iter().copied());
        session
            .load_level_with(
                types.len(),
                1,
                &pool,
                &mut SequenceFill::from_names(types.iter().copied()),
            )
            .unwrap();
        session
    }

    #[test]
    fn test_no_move_outside_started() {
        let session = GameSession::with_defaults();
        let mut bot = Bot::with_seed(BotDifficulty::Easy, 1);
        assert_eq!(bot.choose_move(&session), None);
    }

    #[test]
    fn test_easy_picks_occupied_cell() {
        let session = session(&["a", "b", "c"], 7);
        let mut bot = Bot::with_seed(BotDifficulty::Easy, 42);
        let coord = bot.choose_move(&session).unwrap();
        assert!(session.board().unwrap().get_item_at(coord).is_some());
    }

    #[test]
    fn test_medium_completes_match() {
        let mut session = session(&["a", "a", "b", "c", "a"], 7);
        session.request_move(CellCoord::new(0, 0)).unwrap();
        session.request_move(CellCoord::new(1, 0)).unwrap();

        let mut bot = Bot::with_seed(BotDifficulty::Medium, 7);
        assert_eq!(bot.choose_move(&session), Some(CellCoord::new(4, 0)));
    }

    #[test]
    fn test_medium_grows_existing_group() {
        let mut session = session(&["a", "b", "c", "a"], 7);
        session.request_move(CellCoord::new(0, 0)).unwrap();

        let mut bot = Bot::with_seed(BotDifficulty::Medium, 7);
        assert_eq!(bot.choose_move(&session), Some(CellCoord::new(3, 0)));
    }

    #[test]
    fn test_medium_plays_level_to_a_finish() {
        let mut session = session(&["a", "b", "c", "a", "b", "c", "a", "b", "c"], 4);
        let mut bot = Bot::with_seed(BotDifficulty::Medium, 3);

        while let Some(coord) = bot.choose_move(&session) {
            session.request_move(coord).unwrap();
        }
        assert!(session.is_over());
    }
}
