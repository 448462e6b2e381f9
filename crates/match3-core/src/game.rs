//! Session state machine.
//!
//! This module contains the `GameSession` struct, which owns the level
//! (board + container) and turns engine results into state transitions and
//! notifications.

use crate::actions::{GameAction, GameEvent};
use crate::board::{Board, BoardError, CellCoord, FillPolicy, TripletFill};
use crate::condition::LevelCondition;
use crate::config::{validate_board_size, ConfigError, LevelConfig};
use crate::container::Container;
use crate::engine::{MatchEngine, Resolution};
use crate::item::{Item, ItemId, ItemIdAllocator, ItemTypeRegistry};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// Created, not yet initialised
    Setup,
    /// Waiting for a level to be loaded
    MainMenu,
    /// A level is being played
    Started,
    /// A level is loaded but moves are not accepted
    Paused,
    /// The level ended; load another or return to the menu
    Over,
}

/// How the last level ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
    /// A move or time budget ran out, or the level was ended externally
    Expired,
}

/// Reasons a request is rejected. A rejected request changes nothing and
/// emits no events.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Invalid action for current state")]
    InvalidPhase,

    #[error("Game is paused")]
    Paused,

    #[error("Level is over")]
    GameOver,

    #[error("Cell {0} is empty or out of range")]
    InvalidCell(CellCoord),

    #[error("Item {0} cannot be withdrawn")]
    NotWithdrawable(ItemId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Serializable view of a session, for renderers and remote clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: GameState,
    pub outcome: Option<Outcome>,
    pub width: usize,
    pub height: usize,
    /// Rows of cells, `board[y][x]`
    pub board: Vec<Vec<Option<Item>>>,
    /// Container contents in slot order
    pub container: Vec<Item>,
    pub capacity: usize,
    pub match_size: usize,
    pub moves_remaining: Option<u32>,
    pub time_remaining_ms: Option<u64>,
    /// Item that can currently be sent back to the board
    pub withdrawable: Option<ItemId>,
}

/// One play session: configuration, current level and subscribers
#[derive(Debug)]
pub struct GameSession {
    config: LevelConfig,
    state: GameState,
    engine: Option<MatchEngine>,
    condition: LevelCondition,
    outcome: Option<Outcome>,
    ids: ItemIdAllocator,
    levels_loaded: u64,
    subscribers: Vec<Sender<GameEvent>>,
}

impl GameSession {
    /// Create a session in `Setup`
    pub fn new(config: LevelConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self::build(config, GameState::Setup))
    }

    /// Create a session with the default configuration, already in `MainMenu`
    pub fn with_defaults() -> Self {
        Self::build(LevelConfig::default(), GameState::MainMenu)
    }

    fn build(config: LevelConfig, state: GameState) -> Self {
        Self {
            condition: LevelCondition::from_mode(config.level_mode),
            config,
            state,
            engine: None,
            outcome: None,
            ids: ItemIdAllocator::new(),
            levels_loaded: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.state == GameState::Over
    }

    pub fn engine(&self) -> Option<&MatchEngine> {
        self.engine.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.engine.as_ref().map(MatchEngine::board)
    }

    pub fn container(&self) -> Option<&Container> {
        self.engine.as_ref().map(MatchEngine::container)
    }

    pub fn moves_remaining(&self) -> Option<u32> {
        self.condition.moves_remaining()
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.condition.time_remaining()
    }

    /// Register a subscriber. Every event returned from an operation is also
    /// sent here; dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    // ==================== Lifecycle ====================

    /// `Setup` → `MainMenu`
    pub fn init(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.state != GameState::Setup {
            return Err(GameError::InvalidPhase);
        }
        let mut events = Vec::new();
        self.set_state(GameState::MainMenu, &mut events);
        Ok(self.publish(events))
    }

    /// Build a level with the stock fill policy and start it
    pub fn load_level(
        &mut self,
        width: usize,
        height: usize,
        pool: &ItemTypeRegistry,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut policy = match self.config.seed {
            Some(seed) => {
                TripletFill::with_seed(self.config.matches_min, seed.wrapping_add(self.levels_loaded))
            }
            None => TripletFill::new(self.config.matches_min),
        };
        self.load_level_with(width, height, pool, &mut policy)
    }

    /// Build a level of the configured size with the stock fill policy
    pub fn load_default_level(
        &mut self,
        pool: &ItemTypeRegistry,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.load_level(self.config.board_width, self.config.board_height, pool)
    }

    /// Build a level with a caller-supplied fill policy and start it.
    ///
    /// Accepted from `MainMenu` and from `Over` (restart or next level).
    pub fn load_level_with(
        &mut self,
        width: usize,
        height: usize,
        pool: &ItemTypeRegistry,
        policy: &mut dyn FillPolicy,
    ) -> Result<Vec<GameEvent>, GameError> {
        if !matches!(self.state, GameState::MainMenu | GameState::Over) {
            return Err(GameError::InvalidPhase);
        }
        validate_board_size(width, height)?;

        let mut board = Board::new(width, height);
        board.fill(pool, policy, &mut self.ids)?;
        let container =
            Container::with_match_size(self.config.container_capacity, self.config.matches_min);

        info!(
            width,
            height,
            capacity = container.capacity(),
            match_size = container.match_size(),
            "level loaded"
        );

        let mut events = vec![GameEvent::LevelLoaded {
            width,
            height,
            capacity: container.capacity(),
            match_size: container.match_size(),
        }];

        self.engine = Some(MatchEngine::new(board, container));
        self.condition = LevelCondition::from_mode(self.config.level_mode);
        self.outcome = None;
        self.levels_loaded += 1;

        if let Some(remaining) = self.condition.moves_remaining() {
            events.push(GameEvent::MovesRemaining { remaining });
        }
        self.set_state(GameState::Started, &mut events);
        Ok(self.publish(events))
    }

    /// Tear down the level and go back to `MainMenu`
    pub fn return_to_menu(&mut self) -> Result<Vec<GameEvent>, GameError> {
        match self.state {
            GameState::Setup => return Err(GameError::InvalidPhase),
            GameState::MainMenu => return Ok(Vec::new()),
            _ => {}
        }

        let mut events = Vec::new();
        if let Some(mut engine) = self.engine.take() {
            let removed = engine.reset_container();
            engine.clear_board();
            events.push(GameEvent::ContainerReset {
                removed: removed.iter().map(|i| i.id).collect(),
            });
            events.push(GameEvent::BoardCleared);
        }
        self.set_state(GameState::MainMenu, &mut events);
        Ok(self.publish(events))
    }

    // ==================== Play ====================

    /// Move the item at `coord` into the container
    pub fn request_move(&mut self, coord: CellCoord) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_playing()?;
        let engine = self.engine.as_mut().ok_or(GameError::InvalidPhase)?;
        let report = engine.move_to_container(coord)?;
        let mut events = report.events;

        let budget_spent = self.condition.on_move();
        if let Some(remaining) = self.condition.moves_remaining() {
            events.push(GameEvent::MovesRemaining { remaining });
        }

        match report.resolution {
            Resolution::Won => self.finish(Outcome::Won, &mut events),
            Resolution::Lost => self.finish(Outcome::Lost, &mut events),
            Resolution::Continue if budget_spent => self.finish(Outcome::Expired, &mut events),
            Resolution::Continue => {}
        }

        Ok(self.publish(events))
    }

    /// Send the most recently moved item back to its cell
    pub fn withdraw_from_container(&mut self, id: ItemId) -> Result<Vec<GameEvent>, GameError> {
        self.ensure_playing()?;
        let engine = self.engine.as_mut().ok_or(GameError::InvalidPhase)?;
        let events = engine.withdraw(id)?;
        Ok(self.publish(events))
    }

    /// Pause or resume. Asking for the current state is a no-op.
    pub fn set_paused(&mut self, paused: bool) -> Result<Vec<GameEvent>, GameError> {
        let target = match (self.state, paused) {
            (GameState::Started, true) => GameState::Paused,
            (GameState::Paused, false) => GameState::Started,
            (GameState::Paused, true) | (GameState::Started, false) => return Ok(Vec::new()),
            _ => return Err(GameError::InvalidPhase),
        };
        let mut events = Vec::new();
        self.set_state(target, &mut events);
        Ok(self.publish(events))
    }

    /// Run the level timer. Time only passes while `Started`.
    pub fn advance_clock(&mut self, elapsed: Duration) -> Result<Vec<GameEvent>, GameError> {
        if self.state != GameState::Started {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        if self.condition.on_tick(elapsed) {
            self.finish(Outcome::Expired, &mut events);
        }
        Ok(self.publish(events))
    }

    /// End the level from outside
    pub fn signal_terminal(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if !matches!(self.state, GameState::Started | GameState::Paused) {
            return Err(GameError::InvalidPhase);
        }
        let mut events = Vec::new();
        self.finish(Outcome::Expired, &mut events);
        Ok(self.publish(events))
    }

    // ==================== Teardown ====================

    /// Empty the container. Safe to repeat.
    pub fn reset_container(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(Vec::new());
        };
        let removed = engine.reset_container();
        let events = vec![GameEvent::ContainerReset {
            removed: removed.iter().map(|i| i.id).collect(),
        }];
        Ok(self.publish(events))
    }

    /// Empty the board. Does not decide the level.
    pub fn clear_board(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(Vec::new());
        };
        engine.clear_board();
        Ok(self.publish(vec![GameEvent::BoardCleared]))
    }

    /// Dispatch a serialized intent
    pub fn apply_action(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::LoadLevel {
                width,
                height,
                item_types,
            } => {
                let pool: ItemTypeRegistry = item_types.into_iter().collect();
                let width = width.unwrap_or(self.config.board_width);
                let height = height.unwrap_or(self.config.board_height);
                self.load_level(width, height, &pool)
            }
            GameAction::ReturnToMenu => self.return_to_menu(),
            GameAction::RequestMove(coord) => self.request_move(coord),
            GameAction::Withdraw(id) => self.withdraw_from_container(id),
            GameAction::SetPaused(paused) => self.set_paused(paused),
            GameAction::AdvanceClock { millis } => {
                self.advance_clock(Duration::from_millis(millis))
            }
            GameAction::SignalTerminal => self.signal_terminal(),
            GameAction::ResetContainer => self.reset_container(),
            GameAction::ClearBoard => self.clear_board(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let engine = self.engine.as_ref();
        SessionSnapshot {
            state: self.state,
            outcome: self.outcome,
            width: engine.map_or(0, |e| e.board().width()),
            height: engine.map_or(0, |e| e.board().height()),
            board: engine.map(|e| e.board().to_rows()).unwrap_or_default(),
            container: engine
                .map(|e| e.container().items().to_vec())
                .unwrap_or_default(),
            capacity: engine.map_or(self.config.container_capacity, |e| e.container().capacity()),
            match_size: engine.map_or(self.config.matches_min, |e| e.container().match_size()),
            moves_remaining: self.condition.moves_remaining(),
            time_remaining_ms: self
                .condition
                .time_remaining()
                .map(|d| d.as_millis() as u64),
            withdrawable: engine.and_then(|e| e.last_move()).map(|m| m.item),
        }
    }

    // ==================== Helper Methods ====================

    fn ensure_playing(&self) -> Result<(), GameError> {
        match self.state {
            GameState::Started => Ok(()),
            GameState::Paused => Err(GameError::Paused),
            GameState::Over => Err(GameError::GameOver),
            GameState::Setup | GameState::MainMenu => Err(GameError::InvalidPhase),
        }
    }

    fn set_state(&mut self, state: GameState, events: &mut Vec<GameEvent>) {
        debug!(from = ?self.state, to = ?state, "state changed");
        self.state = state;
        events.push(GameEvent::StateChanged { state });
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) {
        match outcome {
            Outcome::Won => {
                info!("level won");
                events.push(GameEvent::MatchWon);
            }
            Outcome::Lost => {
                info!("level lost, container full");
                events.push(GameEvent::MatchLost);
            }
            Outcome::Expired => {
                info!("level budget expired");
                events.push(GameEvent::ConditionExpired);
            }
        }
        self.outcome = Some(outcome);
        self.set_state(GameState::Over, events);
    }

    /// Send events to subscribers, dropping any that hung up
    fn publish(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        if !events.is_empty() {
            self.subscribers
                .retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
        }
        events
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::with_defaults()
    }
}
