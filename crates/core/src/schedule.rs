//! Delayed transitions with cancellation.
//!
//! Every pause between engine transitions is a spawned sleep that reports
//! back on a channel. The scheduler remembers each transition until the owner
//! acknowledges its delivery, so a cancel catches both sleeps still running
//! and transitions already sitting in the channel.

use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};

/// A state-machine step that runs after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    IssueCommand,
    NextLevel,
    GameOver,
}

/// A transition whose delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub id: u64,
    pub transition: Transition,
}

#[derive(Debug)]
struct Pending {
    id: u64,
    transition: Transition,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Scheduler {
    next_id: u64,
    pending: Vec<Pending>,
    sink: mpsc::UnboundedSender<Due>,
}

impl Scheduler {
    pub fn new(sink: mpsc::UnboundedSender<Due>) -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
            sink,
        }
    }

    pub fn schedule(&mut self, delay: Duration, transition: Transition) {
        self.next_id += 1;
        let due = Due {
            id: self.next_id,
            transition,
        };
        let sink = self.sink.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sink.send(due);
        });
        self.pending.push(Pending {
            id: due.id,
            transition,
            task,
        });
    }

    /// Claims a delivered transition. Returns `false` when it was cancelled
    /// after its sleep finished, in which case it must be ignored.
    pub fn acknowledge(&mut self, due: &Due) -> bool {
        match self.pending.iter().position(|p| p.id == due.id) {
            Some(index) => {
                self.pending.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Aborts every unacknowledged transition and returns them in schedule
    /// order. Safe to call with nothing pending.
    pub fn cancel_all(&mut self) -> Vec<Transition> {
        let mut cancelled: Vec<Pending> = self.pending.drain(..).collect();
        cancelled.sort_by_key(|p| p.id);
        cancelled
            .into_iter()
            .map(|p| {
                p.task.abort();
                p.transition
            })
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for pending in self.pending.drain(..) {
            pending.task.abort();
        }
    }
}
