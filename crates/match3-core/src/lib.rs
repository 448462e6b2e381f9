//! Match-3 staging-container puzzle engine
//!
//! This crate provides the core game logic, including:
//! - A grid board of typed items with pluggable fill policies
//! - A fixed-capacity staging container with match detection and compaction
//! - The match engine that moves items and decides win/lose
//! - A session state machine with a typed event surface
//!
//! # Architecture
//!
//! The engine is synchronous and platform-agnostic: every operation commits
//! its state change before returning, and animation layers only react to the
//! events it emits. It can be compiled to:
//! - Native Rust for server-side hosting
//! - WebAssembly for browser front-ends
//!
//! # Modules
//!
//! - [`item`]: Item types, identities and the type registry
//! - [`board`]: Board, cells and fill policies
//! - [`container`]: The staging container
//! - [`engine`]: Move and match resolution
//! - [`game`]: Session state machine
//! - [`actions`]: Inbound actions and outbound events
//! - [`config`]: Level configuration
//! - [`condition`]: Move and time budgets
//! - [`bot`]: Move suggestions

pub mod actions;
pub mod board;
pub mod bot;
pub mod condition;
pub mod config;
pub mod container;
pub mod engine;
pub mod game;
pub mod item;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{
    Board, BoardError, Cell, CellCoord, FillPolicy, RandomFill, SequenceFill, TripletFill,
};
pub use bot::{Bot, BotDifficulty};
pub use condition::LevelCondition;
pub use config::{ConfigError, LevelConfig, LevelMode};
pub use container::{Container, ContainerFullError, SlotIndex, TripleCandidate};
pub use engine::{LastMove, MatchEngine, MoveReport, Resolution};
pub use game::{GameError, GameSession, GameState, Outcome, SessionSnapshot};
pub use item::{Item, ItemId, ItemIdAllocator, ItemType, ItemTypeRegistry};
