//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources every
//! connection shares: the configuration, the command catalog and the
//! high-score recorder.

use crate::config::Config;
use flagcall_core::{Catalog, ScoreRecorder, score::JsonFileStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub scores: ScoreRecorder,
}

impl AppState {
    /// Builds the state the service runs with: the standard catalog and a
    /// high-score file at `config.score_path`.
    pub fn from_config(config: Config) -> Self {
        let scores = ScoreRecorder::new(Arc::new(JsonFileStore::new(config.score_path.clone())));
        Self {
            config: Arc::new(config),
            catalog: Catalog::standard(),
            scores,
        }
    }
}
