use crate::catalog::FlagCommand;
use serde::{Deserialize, Serialize};

/// Mutable progression state, owned by a single engine.
#[derive(Debug, Clone)]
pub(crate) struct RoundState {
    pub level: u32,
    pub max_level_reached: u32,
    /// Rounds completed in the current level.
    pub round_index: u32,
    /// Failures in the current level.
    pub fail_count: u32,
    pub total_successes: u32,
    pub time_limit_seconds: f64,
    pub remaining_seconds: f64,
    pub active_command: Option<FlagCommand>,
    pub hold_violated: bool,
    pub awaiting_pose: bool,
    pub active: bool,
    pub paused: bool,
}

impl RoundState {
    pub fn new(time_limit_seconds: f64) -> Self {
        Self {
            level: 1,
            max_level_reached: 1,
            round_index: 0,
            fail_count: 0,
            total_successes: 0,
            time_limit_seconds,
            remaining_seconds: time_limit_seconds,
            active_command: None,
            hold_violated: false,
            awaiting_pose: false,
            active: false,
            paused: false,
        }
    }

    /// Resets the per-session counters for a fresh game. The highest level
    /// reached survives across games on the same engine.
    pub fn reset(&mut self, time_limit_seconds: f64) {
        let max_level_reached = self.max_level_reached;
        *self = Self::new(time_limit_seconds);
        self.max_level_reached = max_level_reached;
    }

    pub fn snapshot(&self) -> GameState {
        GameState {
            active: self.active,
            paused: self.paused,
            level: self.level,
            max_level_reached: self.max_level_reached,
            round: self.round_index,
            fail_count: self.fail_count,
            total_successes: self.total_successes,
            time_limit_seconds: self.time_limit_seconds,
            remaining_seconds: self.remaining_seconds,
            active_command: self.active_command.clone(),
            hold_violated: self.hold_violated,
            awaiting_pose: self.awaiting_pose,
        }
    }
}

/// Read-only view of the engine, published on every state change.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameState {
    pub active: bool,
    pub paused: bool,
    pub level: u32,
    pub max_level_reached: u32,
    /// Rounds completed in the current level.
    pub round: u32,
    pub fail_count: u32,
    pub total_successes: u32,
    pub time_limit_seconds: f64,
    pub remaining_seconds: f64,
    pub active_command: Option<FlagCommand>,
    pub hold_violated: bool,
    pub awaiting_pose: bool,
}

/// Summary of a finished (or running) game.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameStats {
    pub level: u32,
    pub total_successes: u32,
    pub play_duration_ms: u64,
    /// Play time as `M:SS`.
    pub formatted_time: String,
}

impl GameStats {
    pub fn new(level: u32, total_successes: u32, play_duration_ms: u64) -> Self {
        Self {
            level,
            total_successes,
            play_duration_ms,
            formatted_time: format_play_time(play_duration_ms),
        }
    }
}

/// Formats milliseconds as `M:SS`, truncating partial seconds.
pub fn format_play_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}
