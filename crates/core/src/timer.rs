//! Round Timer
//!
//! A countdown task that reports the remaining time on a fixed cadence and
//! signals expiry exactly once. Every timer carries an id so the owner can
//! tell a live timer's signals from those of a timer it already cancelled.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::debug;

/// Progress of a running countdown.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TimerTick {
    /// Seconds left, never negative.
    pub remaining: f64,
    /// Full duration of the countdown, in seconds.
    pub total: f64,
    /// `remaining / total * 100`.
    pub percentage: f64,
}

impl TimerTick {
    fn at(remaining: f64, total: f64) -> Self {
        let percentage = if total > 0.0 {
            remaining / total * 100.0
        } else {
            0.0
        };
        Self {
            remaining,
            total,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerSignalKind {
    Tick(TimerTick),
    Expired,
}

/// A message from a running timer to its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSignal {
    pub timer_id: u64,
    pub kind: TimerSignalKind,
}

/// Handle to a running countdown. Dropping it does not stop the task; call
/// [`RoundTimer::cancel`].
#[derive(Debug)]
pub struct RoundTimer {
    id: u64,
    task: JoinHandle<()>,
}

impl RoundTimer {
    /// Spawns a countdown of `total_secs` that ticks every `cadence`.
    pub fn start(
        id: u64,
        total_secs: f64,
        cadence: Duration,
        sink: mpsc::UnboundedSender<TimerSignal>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let elapsed = started.elapsed().as_secs_f64();
                let remaining = (total_secs - elapsed).max(0.0);

                let tick = TimerSignal {
                    timer_id: id,
                    kind: TimerSignalKind::Tick(TimerTick::at(remaining, total_secs)),
                };
                if sink.send(tick).is_err() {
                    return;
                }

                if remaining <= 0.0 {
                    let _ = sink.send(TimerSignal {
                        timer_id: id,
                        kind: TimerSignalKind::Expired,
                    });
                    debug!(timer_id = id, "Round timer expired");
                    return;
                }
            }
        });
        Self { id, task }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops the countdown. Signals already queued by the task are not
    /// recalled; the owner filters them by id.
    pub fn cancel(self) {
        self.task.abort();
    }
}
