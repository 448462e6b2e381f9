//! Level budgets that end a level without it being won or lost.

use crate::config::LevelMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running budget for the current level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelCondition {
    Unlimited,
    Moves { remaining: u32 },
    Timer { remaining: Duration },
}

impl LevelCondition {
    pub fn from_mode(mode: LevelMode) -> Self {
        match mode {
            LevelMode::Unlimited => LevelCondition::Unlimited,
            LevelMode::Moves { limit } => LevelCondition::Moves { remaining: limit },
            // Timers too long for a Duration never run out
            LevelMode::Timer { seconds } => LevelCondition::Timer {
                remaining: Duration::try_from_secs_f32(seconds.max(0.0))
                    .unwrap_or(Duration::MAX),
            },
        }
    }

    /// Count one move. Returns true if this exhausted the budget.
    pub fn on_move(&mut self) -> bool {
        match self {
            LevelCondition::Moves { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            _ => false,
        }
    }

    /// Advance the clock. Returns true if this exhausted the budget.
    pub fn on_tick(&mut self, elapsed: Duration) -> bool {
        match self {
            LevelCondition::Timer { remaining } => {
                let was_running = !remaining.is_zero();
                *remaining = remaining.saturating_sub(elapsed);
                was_running && remaining.is_zero()
            }
            _ => false,
        }
    }

    pub fn moves_remaining(&self) -> Option<u32> {
        match self {
            LevelCondition::Moves { remaining } => Some(*remaining),
            _ => None,
        }
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        match self {
            LevelCondition::Timer { remaining } => Some(*remaining),
            _ => None,
        }
    }
}
