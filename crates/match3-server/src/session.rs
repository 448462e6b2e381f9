//! Per-connection game sessions.

use match3_core::{
    Bot, BotDifficulty, CellCoord, GameAction, GameError, GameEvent, GameSession, GameState,
    LevelConfig, SessionSnapshot,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Action rejected: {0}")]
    Rejected(#[from] GameError),
}

/// A session owned by one connection.
pub struct HostedSession {
    pub id: Uuid,
    session: GameSession,
    hint_delay: Duration,
    /// Last time the player acted, for idle hints
    last_activity: Instant,
    hinted: bool,
}

impl HostedSession {
    /// Create a session already moved to the main menu.
    pub fn new(id: Uuid, config: LevelConfig, now: Instant) -> Result<Self, HostError> {
        config.validate().map_err(GameError::from)?;
        let hint_delay = config.hint_delay();
        let mut session = GameSession::new(config)?;
        session.init()?;

        Ok(Self {
            id,
            session,
            hint_delay,
            last_activity: now,
            hinted: false,
        })
    }

    pub fn state(&self) -> GameState {
        self.session.state()
    }

    /// Apply a client action.
    pub fn apply_action(
        &mut self,
        action: GameAction,
        now: Instant,
    ) -> Result<Vec<GameEvent>, HostError> {
        let events = self.session.apply_action(action)?;
        self.last_activity = now;
        self.hinted = false;
        Ok(events)
    }

    /// Run the level clock.
    pub fn advance_clock(&mut self, elapsed: Duration) -> Vec<GameEvent> {
        self.session.advance_clock(elapsed).unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Suggest a move.
    pub fn hint(&self, difficulty: BotDifficulty) -> Option<CellCoord> {
        Bot::new(difficulty).choose_move(&self.session)
    }

    /// Suggest a move once per idle period, after the hint delay has passed.
    pub fn idle_hint(&mut self, now: Instant) -> Option<CellCoord> {
        if self.hinted
            || self.session.state() != GameState::Started
            || now.saturating_duration_since(self.last_activity) < self.hint_delay
        {
            return None;
        }
        self.hinted = true;
        self.hint(BotDifficulty::Medium)
    }
}
