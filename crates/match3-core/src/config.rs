//! Level configuration, read once when a level is loaded.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default board width
pub const DEFAULT_BOARD_WIDTH: usize = 6;

/// Default board height
pub const DEFAULT_BOARD_HEIGHT: usize = 6;

/// Default number of slots in the staging container
pub const DEFAULT_CONTAINER_CAPACITY: usize = 7;

/// Largest board a level may ask for, in cells
pub const MAX_BOARD_CELLS: usize = 64 * 64;

/// How a level runs out, besides being won or lost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LevelMode {
    /// No external budget
    Unlimited,
    /// Level ends after this many moves
    Moves { limit: u32 },
    /// Level ends after this many seconds of unpaused play
    Timer { seconds: f32 },
}

/// Errors found while loading or validating a configuration
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("Board must be at least 1x1 and at most {max_cells} cells, got {width}x{height}")]
    InvalidBoardSize {
        width: usize,
        height: usize,
        max_cells: usize,
    },

    #[error("matches_min must be at least 2, got {0}")]
    MatchSizeTooSmall(usize),

    #[error("Container capacity {capacity} cannot hold a match of {matches_min}")]
    CapacityTooSmall { capacity: usize, matches_min: usize },

    #[error("Level budget must be positive")]
    EmptyBudget,

    #[error("Level timer is too long to represent")]
    TimerOutOfRange,

    #[error("Hint delay must be a non-negative number of seconds that fits a duration")]
    InvalidHintDelay,

    #[error("Invalid config: {0}")]
    Parse(String),
}

/// Settings consumed by the session at level load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub board_width: usize,
    pub board_height: usize,
    /// Items of one type needed to clear them from the container
    pub matches_min: usize,
    pub container_capacity: usize,
    pub level_mode: LevelMode,
    /// Seconds of inactivity before a presentation layer should show a hint
    pub hint_delay_secs: f32,
    /// Seed for board fills; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            board_height: DEFAULT_BOARD_HEIGHT,
            matches_min: crate::container::DEFAULT_MATCH_SIZE,
            container_capacity: DEFAULT_CONTAINER_CAPACITY,
            level_mode: LevelMode::Timer { seconds: 30.0 },
            hint_delay_secs: 5.0,
            seed: None,
        }
    }
}

impl LevelConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_board_size(self.board_width, self.board_height)?;
        if self.matches_min < 2 {
            return Err(ConfigError::MatchSizeTooSmall(self.matches_min));
        }
        if self.container_capacity < self.matches_min {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.container_capacity,
                matches_min: self.matches_min,
            });
        }
        if Duration::try_from_secs_f32(self.hint_delay_secs).is_err() {
            return Err(ConfigError::InvalidHintDelay);
        }
        match self.level_mode {
            LevelMode::Moves { limit: 0 } => Err(ConfigError::EmptyBudget),
            LevelMode::Timer { seconds } if seconds.is_nan() || seconds <= 0.0 => {
                Err(ConfigError::EmptyBudget)
            }
            LevelMode::Timer { seconds } if Duration::try_from_secs_f32(seconds).is_err() => {
                Err(ConfigError::TimerOutOfRange)
            }
            _ => Ok(()),
        }
    }

    /// Idle time before a hint. Out-of-range values, which `validate`
    /// rejects, fall back to zero.
    pub fn hint_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.hint_delay_secs).unwrap_or_default()
    }
}

pub(crate) fn validate_board_size(width: usize, height: usize) -> Result<(), ConfigError> {
    let cells = width.checked_mul(height).unwrap_or(usize::MAX);
    if width == 0 || height == 0 || cells > MAX_BOARD_CELLS {
        return Err(ConfigError::InvalidBoardSize {
            width,
            height,
            max_cells: MAX_BOARD_CELLS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LevelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matches_min, 3);
        assert_eq!(config.board_width * config.board_height, 36);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LevelConfig::from_json(r#"{ "board_width": 3, "board_height": 4 }"#).unwrap();
        assert_eq!(config.board_width, 3);
        assert_eq!(config.board_height, 4);
        assert_eq!(config.container_capacity, DEFAULT_CONTAINER_CAPACITY);
    }

    #[test]
    fn test_level_mode_json() {
        let config =
            LevelConfig::from_json(r#"{ "level_mode": { "mode": "moves", "limit": 16 } }"#)
                .unwrap();
        assert_eq!(config.level_mode, LevelMode::Moves { limit: 16 });
    }

    #[test]
    fn test_rejects_capacity_below_match_size() {
        let config = LevelConfig {
            container_capacity: 2,
            ..LevelConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityTooSmall {
                capacity: 2,
                matches_min: 3
            })
        );
    }

    #[test]
    fn test_rejects_zero_budget() {
        let config = LevelConfig {
            level_mode: LevelMode::Moves { limit: 0 },
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyBudget));

        let config = LevelConfig {
            level_mode: LevelMode::Timer { seconds: -1.0 },
            ..LevelConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyBudget));
    }

    #[test]
    fn test_rejects_timer_too_long_for_duration() {
        for seconds in [1e20, f32::INFINITY] {
            let config = LevelConfig {
                level_mode: LevelMode::Timer { seconds },
                ..LevelConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::TimerOutOfRange));
        }
    }

    #[test]
    fn test_rejects_unrepresentable_hint_delay() {
        for hint_delay_secs in [f32::NAN, -1.0, 1e20] {
            let config = LevelConfig {
                hint_delay_secs,
                ..LevelConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::InvalidHintDelay));
            // Never panics, even unvalidated
            assert_eq!(config.hint_delay(), Duration::ZERO);
        }
    }

    #[test]
    fn test_board_size_bounds() {
        assert!(validate_board_size(1, 1).is_ok());
        assert!(validate_board_size(64, 64).is_ok());
        assert!(validate_board_size(0, 4).is_err());
        assert_eq!(
            validate_board_size(100_000, 100_000),
            Err(ConfigError::InvalidBoardSize {
                width: 100_000,
                height: 100_000,
                max_cells: MAX_BOARD_CELLS,
            })
        );
        // Overflowing products are rejected, not wrapped
        assert!(validate_board_size(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            LevelConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
