//! Holds the round timer back until the browser has spoken the command.

use std::time::Duration;
use tokio::time::Instant;

/// What the session should do after a gate transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Start the round timer now.
    Open,
    /// Keep waiting for `speech_ended` or the deadline.
    Waiting,
    /// Nothing was being waited on.
    Idle,
}

#[derive(Debug)]
pub struct SpeechGate {
    enabled: bool,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl SpeechGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            enabled: true,
            timeout,
            deadline: None,
        }
    }

    /// A command was just sent to the browser.
    pub fn arm(&mut self) -> Gate {
        if !self.enabled {
            self.deadline = None;
            return Gate::Open;
        }
        self.deadline = Some(Instant::now() + self.timeout);
        Gate::Waiting
    }

    /// The browser reported the end of speech.
    pub fn release(&mut self) -> Gate {
        match self.deadline.take() {
            Some(_) => Gate::Open,
            None => Gate::Idle,
        }
    }

    /// Drops a pending wait without starting anything.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Turning speech off while a command waits releases it at once.
    pub fn set_enabled(&mut self, enabled: bool) -> Gate {
        self.enabled = enabled;
        if enabled {
            return Gate::Idle;
        }
        self.release()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Resolves at `deadline`, or never when there is none.
pub async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
