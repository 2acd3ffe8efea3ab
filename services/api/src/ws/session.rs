//! Manages the WebSocket connection lifecycle for one game session.
//!
//! Every connection owns a private engine. The session relays engine events
//! to the browser, asks it to speak each command, starts the round timer
//! once speech is over and feeds classified poses back into the engine.

use super::{
    protocol::{ClientMessage, ServerMessage},
    speech::{Gate, SpeechGate, wait_for},
};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use flagcall_core::{EngineBuilder, EngineHandle, GameEvent, cue::cues_for};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

type SocketSink = SplitSink<WebSocket, Message>;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", &session_id.to_string());
    info!("New WebSocket connection");

    let (socket_tx, socket_rx) = socket.split();
    let (engine, events) = EngineBuilder::new()
        .config(state.config.engine.clone())
        .catalog(state.catalog.clone())
        .scores(state.scores.clone())
        .spawn();

    let mut session = GameSession {
        engine,
        socket_tx,
        speech: SpeechGate::new(state.config.speech_timeout),
        round_live: false,
        max_fails: state.config.engine.max_fails,
    };
    if let Err(e) = session.run(session_id, socket_rx, events).await {
        error!(error = ?e, "Game session terminated with error.");
    }
    info!("Game session finished; engine released.");
}

struct GameSession {
    engine: EngineHandle,
    socket_tx: SocketSink,
    speech: SpeechGate,
    /// The round timer is running and poses can decide the round.
    round_live: bool,
    max_fails: u32,
}

impl GameSession {
    async fn run(
        &mut self,
        session_id: Uuid,
        mut socket_rx: SplitStream<WebSocket>,
        mut events: UnboundedReceiver<GameEvent>,
    ) -> Result<()> {
        self.send(ServerMessage::Connected { session_id }).await?;

        loop {
            let speech_deadline = self.speech.deadline();
            tokio::select! {
                incoming = socket_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => self.handle_client_message(msg).await?,
                            Err(e) => {
                                warn!(error = %e, "Ignoring malformed client message.");
                                self.send(ServerMessage::Error {
                                    message: format!("Malformed message: {e}"),
                                })
                                .await?;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the connection.");
                        break;
                    }
                    Some(Ok(_)) => trace!("Ignoring non-text frame."),
                    Some(Err(e)) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                },
                Some(event) = events.recv() => self.relay_event(event).await?,
                _ = wait_for(speech_deadline) => {
                    warn!("Browser never reported the end of speech; starting the round timer.");
                    self.speech.cancel();
                    self.start_round_timer().await;
                }
            }
        }

        self.engine.stop().await;
        Ok(())
    }

    async fn handle_client_message(&mut self, msg: ClientMessage) -> Result<()> {
        match msg {
            ClientMessage::Start => {
                self.end_round();
                self.engine.start().await;
            }
            ClientMessage::Stop => {
                self.end_round();
                self.engine.stop().await;
            }
            ClientMessage::Pause => {
                self.end_round();
                self.engine.pause().await;
            }
            ClientMessage::Resume => {
                self.engine.resume().await;
                self.repeat_live_command().await?;
            }
            ClientMessage::Pose { label } => {
                if self.round_live {
                    self.engine.verify_pose(label).await;
                } else {
                    trace!(%label, "Dropping pose outside a live round.");
                }
            }
            ClientMessage::SpeechEnded => match self.speech.release() {
                Gate::Open => self.start_round_timer().await,
                _ => debug!("Speech ended with no command waiting."),
            },
            ClientMessage::SetSpeechEnabled { enabled } => {
                info!(enabled, "Speech toggled by client.");
                if self.speech.set_enabled(enabled) == Gate::Open {
                    self.start_round_timer().await;
                }
            }
            ClientMessage::GetState => {
                let state = self.engine.get_state().await?;
                self.send(ServerMessage::State { state }).await?;
            }
            ClientMessage::GetStats => {
                let stats = self.engine.get_stats().await?;
                self.send(ServerMessage::Stats { stats }).await?;
            }
        }
        Ok(())
    }

    async fn relay_event(&mut self, event: GameEvent) -> Result<()> {
        let cues = cues_for(&event, self.max_fails);
        let speak = match &event {
            GameEvent::CommandIssued(issued) => Some(ServerMessage::Speak {
                text: issued.command.text.clone(),
                round: issued.round,
            }),
            GameEvent::RoundResult(_) | GameEvent::GameOver(_) => {
                self.end_round();
                None
            }
            _ => None,
        };
        if !matches!(event, GameEvent::TimerTick(_)) {
            debug!(event = event.name(), "Relaying engine event.");
        }

        self.send(ServerMessage::Event { event }).await?;
        for cue in cues {
            self.send(ServerMessage::Cue { cue }).await?;
        }
        if let Some(speak) = speak {
            self.send(speak).await?;
            if self.speech.arm() == Gate::Open {
                self.start_round_timer().await;
            }
        }
        Ok(())
    }

    /// After a resume, a command that was interrupted is spoken again and
    /// its round restarts from a full timer.
    async fn repeat_live_command(&mut self) -> Result<()> {
        let state = self.engine.get_state().await?;
        if !state.active || state.paused || state.awaiting_pose {
            return Ok(());
        }
        let Some(command) = state.active_command else {
            return Ok(());
        };

        info!(command = %command.text, "Repeating interrupted command.");
        self.send(ServerMessage::Speak {
            text: command.text,
            round: state.round + 1,
        })
        .await?;
        if self.speech.arm() == Gate::Open {
            self.start_round_timer().await;
        }
        Ok(())
    }

    async fn start_round_timer(&mut self) {
        self.engine.start_command_timer().await;
        self.round_live = true;
    }

    fn end_round(&mut self) {
        self.speech.cancel();
        self.round_live = false;
    }

    async fn send(&mut self, msg: ServerMessage) -> Result<()> {
        send_msg(&mut self.socket_tx, msg).await
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(socket_tx: &mut SocketSink, msg: ServerMessage) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
