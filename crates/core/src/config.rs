//! Engine tuning: round counts, time limits and the pauses between transitions.

use std::ops::Range;
use std::time::Duration;

/// Holds every knob of the progression state machine.
///
/// The defaults give the classic game: five rounds per level, two
/// failures end the game, and the time limit shrinks by 0.1 s per level from
/// 1.0 s down to 0.2 s.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Time limit of level 1, in seconds.
    pub base_time_limit: f64,
    /// Seconds removed from the time limit at each level.
    pub time_decrement: f64,
    /// Floor for the time limit, in seconds.
    pub min_time_limit: f64,
    pub rounds_per_level: u32,
    pub max_fails: u32,
    /// Pause between `start()` and the first command.
    pub start_delay: Duration,
    /// Celebration pause between a level-complete event and the next level.
    pub level_complete_delay: Duration,
    /// Pause between entering a level and its first command.
    pub next_level_delay: Duration,
    /// Pause between the deciding failure and the game-over event.
    pub game_over_delay: Duration,
    /// Post-round pause before the next command, drawn uniformly, in milliseconds.
    pub post_round_delay_ms: Range<u64>,
    /// Pause before transitions parked by `pause()` run again after `resume()`.
    pub resume_delay: Duration,
    /// Round timer cadence.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_time_limit: 1.0,
            time_decrement: 0.1,
            min_time_limit: 0.2,
            rounds_per_level: 5,
            max_fails: 2,
            start_delay: Duration::from_millis(1000),
            level_complete_delay: Duration::from_millis(2000),
            next_level_delay: Duration::from_millis(500),
            game_over_delay: Duration::from_millis(1000),
            post_round_delay_ms: 500..1000,
            resume_delay: Duration::from_millis(500),
            tick_interval: Duration::from_millis(16),
        }
    }
}

impl EngineConfig {
    /// Time limit for `level`: `max(min, base - (level - 1) * decrement)`.
    pub fn time_limit_for(&self, level: u32) -> f64 {
        let steps = f64::from(level.saturating_sub(1));
        (self.base_time_limit - steps * self.time_decrement).max(self.min_time_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_limit_shrinks_per_level() {
        let config = EngineConfig::default();
        assert_relative_eq!(config.time_limit_for(1), 1.0);
        assert_relative_eq!(config.time_limit_for(2), 0.9, epsilon = 1e-9);
        assert_relative_eq!(config.time_limit_for(5), 0.6, epsilon = 1e-9);
    }

    #[test]
    fn test_time_limit_clamps_at_minimum() {
        let config = EngineConfig::default();
        assert_relative_eq!(config.time_limit_for(9), 0.2, epsilon = 1e-9);
        assert_relative_eq!(config.time_limit_for(10), 0.2);
        assert_relative_eq!(config.time_limit_for(50), 0.2);
    }

    #[test]
    fn test_time_limit_level_zero_is_treated_as_first_level() {
        let config = EngineConfig::default();
        assert_relative_eq!(config.time_limit_for(0), 1.0);
    }

    #[test]
    fn test_custom_curve() {
        let config = EngineConfig {
            base_time_limit: 1.5,
            time_decrement: 0.25,
            min_time_limit: 0.5,
            ..Default::default()
        };
        assert_relative_eq!(config.time_limit_for(3), 1.0);
        assert_relative_eq!(config.time_limit_for(6), 0.5);
    }
}
