//! Flagcall Core
//!
//! The round and level progression engine of the "raise the flag" game. A
//! driver starts an [`engine::EngineHandle`], speaks each issued command,
//! starts the round timer and feeds recognised poses back in; the engine
//! decides every outcome and reports it as [`events::GameEvent`]s.

pub mod catalog;
pub mod config;
pub mod cue;
pub mod engine;
pub mod events;
pub mod schedule;
pub mod score;
pub mod state;
pub mod timer;

pub use catalog::{Catalog, CommandKind, FlagCommand, PoseLabel};
pub use config::EngineConfig;
pub use engine::{EngineBuilder, EngineClosed, EngineHandle};
pub use events::GameEvent;
pub use score::{RecordOutcome, ScoreRecord, ScoreRecorder};
pub use state::{GameState, GameStats};
