//! Typed notifications the engine publishes to its driver.

use crate::{
    catalog::FlagCommand,
    score::RecordOutcome,
    state::{GameState, GameStats},
    timer::TimerTick,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Success,
    Failure,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommandIssued {
    pub command: FlagCommand,
    /// 1-based round number within the level.
    pub round: u32,
    pub time_limit: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub result: RoundOutcome,
    /// Rounds completed in the level, including this one.
    pub round: u32,
    pub fail_count: u32,
    pub total_successes: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LevelComplete {
    pub level: u32,
    pub fail_count: u32,
    pub total_successes: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub stats: GameStats,
    pub record: RecordOutcome,
}

/// Everything the engine tells the outside world, in emission order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    CommandIssued(CommandIssued),
    RoundResult(RoundResult),
    LevelComplete(LevelComplete),
    GameOver(GameOver),
    TimerTick(TimerTick),
    StateChanged(GameState),
}

impl GameEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::CommandIssued(_) => "command_issued",
            GameEvent::RoundResult(_) => "round_result",
            GameEvent::LevelComplete(_) => "level_complete",
            GameEvent::GameOver(_) => "game_over",
            GameEvent::TimerTick(_) => "timer_tick",
            GameEvent::StateChanged(_) => "state_changed",
        }
    }
}
