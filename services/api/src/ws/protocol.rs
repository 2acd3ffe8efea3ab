//! Defines the WebSocket message protocol between the browser client and the API server.

use flagcall_core::{GameEvent, GameState, GameStats, PoseLabel, cue::AudioCue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts a new game, abandoning any game in progress.
    Start,
    Stop,
    Pause,
    Resume,
    /// One classified pose from the webcam loop.
    Pose { label: PoseLabel },
    /// The browser finished speaking the last `speak` text.
    SpeechEnded,
    /// Turns spoken commands on or off. With speech off the round timer
    /// starts as soon as a command is issued.
    SetSpeechEnabled { enabled: bool },
    GetState,
    GetStats,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    Connected { session_id: Uuid },
    /// An engine event, relayed verbatim.
    Event { event: GameEvent },
    /// Text to speak aloud. Reply with `speech_ended` once it has been said.
    Speak { text: String, round: u32 },
    /// A sound effect to play.
    Cue { cue: AudioCue },
    State { state: GameState },
    Stats { stats: GameStats },
    Error { message: String },
}
