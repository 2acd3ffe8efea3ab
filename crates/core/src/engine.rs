//! Progression State Machine
//!
//! The engine is an actor: one task owns the [`RoundState`] and reacts to
//! three inputs, namely calls from its [`EngineHandle`], signals from the
//! round timer and delayed transitions coming due. Nothing else mutates the
//! state; the outside world sees it through [`GameEvent`]s and the
//! `get_state`/`get_stats` queries.

use crate::{
    catalog::{Catalog, CommandKind, PoseLabel},
    config::EngineConfig,
    events::{CommandIssued, GameEvent, GameOver, LevelComplete, RoundOutcome, RoundResult},
    schedule::{Due, Scheduler, Transition},
    score::ScoreRecorder,
    state::{GameState, GameStats, RoundState},
    timer::{RoundTimer, TimerSignal, TimerSignalKind},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};
use tracing::{Instrument, debug, info, trace};

const INBOX_CAPACITY: usize = 64;

#[derive(Debug)]
enum EngineMessage {
    Start,
    Stop,
    Pause,
    Resume,
    StartCommandTimer,
    VerifyPose(PoseLabel),
    GetState(oneshot::Sender<GameState>),
    GetStats(oneshot::Sender<GameStats>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("The game engine has shut down")]
pub struct EngineClosed;

/// The driver's side of an engine. Cheap to clone; the engine shuts down once
/// every handle is dropped.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    async fn send(&self, message: EngineMessage) {
        if self.tx.send(message).await.is_err() {
            debug!("Game engine is gone; dropping call");
        }
    }

    /// Resets all counters and issues the first command after the start delay.
    pub async fn start(&self) {
        self.send(EngineMessage::Start).await
    }

    /// Returns the engine to idle and cancels everything pending.
    pub async fn stop(&self) {
        self.send(EngineMessage::Stop).await
    }

    pub async fn pause(&self) {
        self.send(EngineMessage::Pause).await
    }

    pub async fn resume(&self) {
        self.send(EngineMessage::Resume).await
    }

    /// Starts the countdown for the issued command. Call once the command has
    /// been spoken.
    pub async fn start_command_timer(&self) {
        self.send(EngineMessage::StartCommandTimer).await
    }

    /// Feeds one recognised pose. Ignored unless a round is waiting for one.
    pub async fn verify_pose(&self, label: PoseLabel) {
        self.send(EngineMessage::VerifyPose(label)).await
    }

    pub async fn get_state(&self) -> Result<GameState, EngineClosed> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::GetState(tx))
            .await
            .map_err(|_| EngineClosed)?;
        rx.await.map_err(|_| EngineClosed)
    }

    pub async fn get_stats(&self) -> Result<GameStats, EngineClosed> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(EngineMessage::GetStats(tx))
            .await
            .map_err(|_| EngineClosed)?;
        rx.await.map_err(|_| EngineClosed)
    }
}

/// Assembles an engine and spawns it on the current tokio runtime.
pub struct EngineBuilder {
    config: EngineConfig,
    catalog: Catalog,
    scores: Option<ScoreRecorder>,
    seed: Option<u64>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: Catalog::standard(),
            scores: None,
            seed: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn scores(mut self, scores: ScoreRecorder) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Fixes the command draws and post-round delays.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spawns the engine task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> (EngineHandle, mpsc::UnboundedReceiver<GameEvent>) {
        let (tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let (events, event_rx) = mpsc::unbounded_channel();
        let (timer_sink, timer_rx) = mpsc::unbounded_channel();
        let (due_sink, due_rx) = mpsc::unbounded_channel();

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = RoundState::new(self.config.time_limit_for(1));

        let engine = Engine {
            config: self.config,
            catalog: self.catalog,
            scores: self.scores.unwrap_or_else(ScoreRecorder::in_memory),
            rng,
            state,
            events,
            timer: None,
            timer_sink,
            next_timer_id: 0,
            scheduler: Scheduler::new(due_sink),
            parked: Vec::new(),
            started_at: None,
            ended_at: None,
        };
        tokio::spawn(engine.run(inbox, timer_rx, due_rx).in_current_span());

        (EngineHandle { tx }, event_rx)
    }
}

struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    scores: ScoreRecorder,
    rng: StdRng,
    state: RoundState,
    events: mpsc::UnboundedSender<GameEvent>,
    timer: Option<RoundTimer>,
    timer_sink: mpsc::UnboundedSender<TimerSignal>,
    next_timer_id: u64,
    scheduler: Scheduler,
    /// Transitions cancelled by `pause()`, re-armed by `resume()`.
    parked: Vec<Transition>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl Engine {
    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<EngineMessage>,
        mut timer_rx: mpsc::UnboundedReceiver<TimerSignal>,
        mut due_rx: mpsc::UnboundedReceiver<Due>,
    ) {
        debug!("Game engine running");
        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },
                Some(signal) = timer_rx.recv() => self.on_timer(signal),
                Some(due) = due_rx.recv() => self.on_due(due).await,
            }
        }

        self.clear_timer();
        self.scheduler.cancel_all();
        debug!("Game engine shut down");
    }

    fn handle_message(&mut self, message: EngineMessage) {
        match message {
            EngineMessage::Start => self.start(),
            EngineMessage::Stop => self.stop(),
            EngineMessage::Pause => self.pause(),
            EngineMessage::Resume => self.resume(),
            EngineMessage::StartCommandTimer => self.start_command_timer(),
            EngineMessage::VerifyPose(label) => self.verify_pose(label),
            EngineMessage::GetState(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
            EngineMessage::GetStats(reply) => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn on_timer(&mut self, signal: TimerSignal) {
        let live = self
            .timer
            .as_ref()
            .is_some_and(|timer| timer.id() == signal.timer_id);
        if !live {
            trace!(timer_id = signal.timer_id, "Dropping signal from a cancelled timer");
            return;
        }

        match signal.kind {
            TimerSignalKind::Tick(tick) => {
                self.state.remaining_seconds = tick.remaining;
                self.emit(GameEvent::TimerTick(tick));
            }
            TimerSignalKind::Expired => {
                self.clear_timer();
                self.handle_timeout();
            }
        }
    }

    async fn on_due(&mut self, due: Due) {
        if !self.scheduler.acknowledge(&due) {
            debug!(transition = ?due.transition, "Dropping cancelled transition");
            return;
        }
        match due.transition {
            Transition::IssueCommand => self.issue_new_command().await,
            Transition::NextLevel => self.next_level(),
            Transition::GameOver => self.game_over().await,
        }
    }

    fn emit(&self, event: GameEvent) {
        // A driver that stopped listening is not the engine's problem.
        let _ = self.events.send(event);
    }

    fn notify_state_change(&self) {
        self.emit(GameEvent::StateChanged(self.state.snapshot()));
    }

    fn clear_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn cancel_pending(&mut self) {
        self.scheduler.cancel_all();
        self.parked.clear();
    }

    fn start(&mut self) {
        self.clear_timer();
        self.cancel_pending();

        self.state.reset(self.config.time_limit_for(1));
        self.state.active = true;
        self.started_at = Some(Instant::now());
        self.ended_at = None;

        info!(
            time_limit = self.state.time_limit_seconds,
            "Game started"
        );
        self.notify_state_change();
        self.scheduler
            .schedule(self.config.start_delay, Transition::IssueCommand);
    }

    fn stop(&mut self) {
        self.clear_timer();
        self.cancel_pending();

        if self.state.active {
            self.ended_at = Some(Instant::now());
            info!(level = self.state.level, "Game stopped");
        }
        self.state.active = false;
        self.state.paused = false;
        self.state.awaiting_pose = false;
        self.state.active_command = None;
        self.notify_state_change();
    }

    fn pause(&mut self) {
        if !self.state.active || self.state.paused {
            debug!("Ignoring pause outside a running game");
            return;
        }
        self.clear_timer();
        self.parked = self.scheduler.cancel_all();
        self.state.paused = true;
        self.state.awaiting_pose = false;

        info!(parked = self.parked.len(), "Game paused");
        self.notify_state_change();
    }

    fn resume(&mut self) {
        if !self.state.active || !self.state.paused {
            debug!("Ignoring resume outside a paused game");
            return;
        }
        self.state.paused = false;
        for transition in std::mem::take(&mut self.parked) {
            self.scheduler.schedule(self.config.resume_delay, transition);
        }

        info!("Game resumed");
        self.notify_state_change();
    }

    async fn issue_new_command(&mut self) {
        if !self.state.active || self.state.paused {
            return;
        }
        if self.state.round_index >= self.config.rounds_per_level {
            self.complete_level().await;
            return;
        }

        let command = self.catalog.select_weighted(&mut self.rng).clone();
        self.state.hold_violated = false;
        self.state.remaining_seconds = self.state.time_limit_seconds;
        self.state.active_command = Some(command.clone());

        let round = self.state.round_index + 1;
        debug!(command = %command.text, round, "Command issued");
        self.emit(GameEvent::CommandIssued(CommandIssued {
            command,
            round,
            time_limit: self.state.time_limit_seconds,
        }));
    }

    fn start_command_timer(&mut self) {
        if !self.state.active || self.state.paused || self.state.active_command.is_none() {
            debug!("Ignoring timer start without a live command");
            return;
        }
        self.clear_timer();
        self.state.awaiting_pose = true;

        self.next_timer_id += 1;
        self.timer = Some(RoundTimer::start(
            self.next_timer_id,
            self.state.time_limit_seconds,
            self.config.tick_interval,
            self.timer_sink.clone(),
        ));
    }

    fn verify_pose(&mut self, label: PoseLabel) {
        if !self.state.active || self.state.paused || !self.state.awaiting_pose {
            return;
        }
        let Some((kind, expected)) = self
            .state
            .active_command
            .as_ref()
            .map(|command| (command.kind, command.expected_pose))
        else {
            return;
        };

        match kind {
            CommandKind::Hold => {
                // Judged at timeout; only remember the slip.
                if label != PoseLabel::Neutral && !self.state.hold_violated {
                    debug!(%label, "Hold command violated");
                    self.state.hold_violated = true;
                }
            }
            CommandKind::Raise => {
                if label == expected {
                    self.handle_success();
                }
            }
        }
    }

    fn handle_timeout(&mut self) {
        let Some(kind) = self.state.active_command.as_ref().map(|c| c.kind) else {
            return;
        };
        match kind {
            CommandKind::Hold if !self.state.hold_violated => self.handle_success(),
            _ => self.handle_failure(),
        }
    }

    fn end_round(&mut self) {
        self.clear_timer();
        self.state.awaiting_pose = false;
        self.state.active_command = None;
    }

    fn handle_success(&mut self) {
        self.end_round();
        self.state.total_successes += 1;
        self.state.round_index += 1;

        self.emit(GameEvent::RoundResult(RoundResult {
            result: RoundOutcome::Success,
            round: self.state.round_index,
            fail_count: self.state.fail_count,
            total_successes: self.state.total_successes,
        }));
        self.notify_state_change();
        self.schedule_next_command();
    }

    fn handle_failure(&mut self) {
        self.end_round();
        self.state.fail_count += 1;
        self.state.round_index += 1;

        self.emit(GameEvent::RoundResult(RoundResult {
            result: RoundOutcome::Failure,
            round: self.state.round_index,
            fail_count: self.state.fail_count,
            total_successes: self.state.total_successes,
        }));
        self.notify_state_change();

        if self.state.fail_count >= self.config.max_fails {
            info!(level = self.state.level, "Fail limit reached");
            self.scheduler
                .schedule(self.config.game_over_delay, Transition::GameOver);
        } else {
            self.schedule_next_command();
        }
    }

    fn schedule_next_command(&mut self) {
        let range = self.config.post_round_delay_ms.clone();
        let millis = if range.is_empty() {
            range.start
        } else {
            self.rng.random_range(range)
        };
        self.scheduler
            .schedule(Duration::from_millis(millis), Transition::IssueCommand);
    }

    async fn complete_level(&mut self) {
        if self.state.fail_count >= self.config.max_fails {
            self.game_over().await;
            return;
        }

        info!(
            level = self.state.level,
            fail_count = self.state.fail_count,
            "Level complete"
        );
        self.emit(GameEvent::LevelComplete(LevelComplete {
            level: self.state.level,
            fail_count: self.state.fail_count,
            total_successes: self.state.total_successes,
        }));
        self.scheduler
            .schedule(self.config.level_complete_delay, Transition::NextLevel);
    }

    fn next_level(&mut self) {
        if !self.state.active {
            return;
        }
        self.state.level += 1;
        self.state.round_index = 0;
        self.state.fail_count = 0;
        self.state.time_limit_seconds = self.config.time_limit_for(self.state.level);
        self.state.remaining_seconds = self.state.time_limit_seconds;
        if self.state.level > self.state.max_level_reached {
            self.state.max_level_reached = self.state.level;
        }

        info!(
            level = self.state.level,
            time_limit = self.state.time_limit_seconds,
            "Entering next level"
        );
        self.notify_state_change();
        self.scheduler
            .schedule(self.config.next_level_delay, Transition::IssueCommand);
    }

    async fn game_over(&mut self) {
        if !self.state.active {
            return;
        }
        self.state.active = false;
        self.state.awaiting_pose = false;
        self.state.active_command = None;
        self.clear_timer();
        self.cancel_pending();
        self.ended_at = Some(Instant::now());

        let stats = self.stats();
        let record = self.scores.record(&stats).await;
        info!(
            level = stats.level,
            total_successes = stats.total_successes,
            play_time = %stats.formatted_time,
            new_record = record.is_new_record,
            "Game over"
        );
        self.emit(GameEvent::GameOver(GameOver { stats, record }));
    }

    fn stats(&self) -> GameStats {
        let played = match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };
        let played_ms = u64::try_from(played.as_millis()).unwrap_or(u64::MAX);
        GameStats::new(self.state.level, self.state.total_successes, played_ms)
    }
}
