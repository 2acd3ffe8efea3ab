//! Sound cues the browser plays in response to engine events.

use crate::events::{GameEvent, RoundOutcome};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioCue {
    Success,
    Fail,
    Warning,
    GameOver,
    LevelComplete,
}

/// Cues for `event`, in playback order.
///
/// A failure plays `fail`, then `warning` when one failure remains or
/// `gameover` when the threshold is hit.
pub fn cues_for(event: &GameEvent, max_fails: u32) -> Vec<AudioCue> {
    match event {
        GameEvent::RoundResult(result) => match result.result {
            RoundOutcome::Success => vec![AudioCue::Success],
            RoundOutcome::Failure if result.fail_count >= max_fails => {
                vec![AudioCue::Fail, AudioCue::GameOver]
            }
            RoundOutcome::Failure if result.fail_count + 1 == max_fails => {
                vec![AudioCue::Fail, AudioCue::Warning]
            }
            RoundOutcome::Failure => vec![AudioCue::Fail],
        },
        GameEvent::LevelComplete(_) => vec![AudioCue::LevelComplete],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LevelComplete, RoundResult};

    fn failure(fail_count: u32) -> GameEvent {
        GameEvent::RoundResult(RoundResult {
            result: RoundOutcome::Failure,
            round: 2,
            fail_count,
            total_successes: 1,
        })
    }

    #[test]
    fn test_success_cue() {
        let event = GameEvent::RoundResult(RoundResult {
            result: RoundOutcome::Success,
            round: 1,
            fail_count: 1,
            total_successes: 1,
        });
        assert_eq!(cues_for(&event, 2), vec![AudioCue::Success]);
    }

    #[test]
    fn test_failure_cues_escalate() {
        assert_eq!(cues_for(&failure(1), 2), vec![AudioCue::Fail, AudioCue::Warning]);
        assert_eq!(cues_for(&failure(2), 2), vec![AudioCue::Fail, AudioCue::GameOver]);
        assert_eq!(cues_for(&failure(1), 3), vec![AudioCue::Fail]);
    }

    #[test]
    fn test_level_complete_cue() {
        let event = GameEvent::LevelComplete(LevelComplete {
            level: 1,
            fail_count: 0,
            total_successes: 5,
        });
        assert_eq!(cues_for(&event, 2), vec![AudioCue::LevelComplete]);
    }

    #[test]
    fn test_cue_names() {
        assert_eq!(serde_json::to_string(&AudioCue::GameOver).unwrap(), "\"gameover\"");
        assert_eq!(
            serde_json::to_string(&AudioCue::LevelComplete).unwrap(),
            "\"levelcomplete\""
        );
    }
}
