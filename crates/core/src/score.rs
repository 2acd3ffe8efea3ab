//! Score Recorder
//!
//! Best level and best success count, kept in a key-value store that lives
//! outside the engine. Persistence is best-effort: read failures look like an
//! empty record and write failures are reported as "not a new record".

use crate::state::GameStats;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Storage key of the high-score record.
pub const HIGH_SCORE_KEY: &str = "bluewhite_highscore";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Score store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Score store holds malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Score store unavailable: {0}")]
    Unavailable(String),
}

/// A persistent string-keyed store of JSON values.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// An in-process store, used when nothing needs to outlive the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Keeps every key in one JSON object on disk.
///
/// A missing file is an empty store. Writes replace the file through a
/// temporary sibling so a crash never leaves a half-written record.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ScoreStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.read_all().await {
            Ok(entries) => entries,
            Err(StoreError::Json(e)) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable score file");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// The best results seen so far. Both fields only ever grow.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreRecord {
    #[serde(default, alias = "bestLevel")]
    pub best_level: u32,
    #[serde(default, alias = "bestSuccess")]
    pub best_successes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of submitting a finished game to the recorder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The best record after this game was taken into account.
    pub best: ScoreRecord,
    pub is_new_record: bool,
}

#[derive(Clone)]
pub struct ScoreRecorder {
    store: Arc<dyn ScoreStore>,
}

impl ScoreRecorder {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self { store }
    }

    /// A recorder backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Reads the stored record, surfacing store and decoding failures.
    pub async fn try_load(&self) -> Result<ScoreRecord, StoreError> {
        match self.store.get(HIGH_SCORE_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(ScoreRecord::default()),
        }
    }

    /// Reads the stored record, treating absence and corruption alike.
    pub async fn load(&self) -> ScoreRecord {
        self.try_load().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load high score; starting from zero");
            ScoreRecord::default()
        })
    }

    /// Merges `stats` into the stored record. Level and success count are
    /// compared independently; either improving makes a new record.
    pub async fn record(&self, stats: &GameStats) -> RecordOutcome {
        let previous = self.load().await;
        let mut best = previous.clone();
        let mut improved = false;

        if stats.level > best.best_level {
            best.best_level = stats.level;
            improved = true;
        }
        if stats.total_successes > best.best_successes {
            best.best_successes = stats.total_successes;
            improved = true;
        }

        if !improved {
            return RecordOutcome {
                best,
                is_new_record: false,
            };
        }

        best.updated_at = Some(Utc::now());
        let written = match serde_json::to_value(&best) {
            Ok(value) => self.store.set(HIGH_SCORE_KEY, value).await,
            Err(e) => Err(e.into()),
        };

        match written {
            Ok(()) => {
                info!(
                    best_level = best.best_level,
                    best_successes = best.best_successes,
                    "New high score saved"
                );
                RecordOutcome {
                    best,
                    is_new_record: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to save high score");
                RecordOutcome {
                    best: previous,
                    is_new_record: false,
                }
            }
        }
    }

    /// Persists `stats` if it beats the stored record and says whether it did.
    pub async fn save(&self, stats: &GameStats) -> bool {
        self.record(stats).await.is_new_record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats(level: u32, successes: u32) -> GameStats {
        GameStats::new(level, successes, 12_000)
    }

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let recorder = ScoreRecorder::in_memory();
        assert_eq!(recorder.load().await, ScoreRecord::default());
    }

    #[tokio::test]
    async fn test_save_improves_then_rejects_repeat() {
        let recorder = ScoreRecorder::in_memory();

        assert!(recorder.save(&stats(3, 12)).await);
        let first = recorder.load().await;
        assert_eq!(first.best_level, 3);
        assert_eq!(first.best_successes, 12);
        assert!(first.updated_at.is_some());

        assert!(!recorder.save(&stats(2, 12)).await);
        assert_eq!(recorder.load().await, first);
    }

    #[tokio::test]
    async fn test_fields_improve_independently() {
        let recorder = ScoreRecorder::in_memory();
        recorder.save(&stats(4, 10)).await;

        let outcome = recorder.record(&stats(2, 15)).await;
        assert!(outcome.is_new_record);
        assert_eq!(outcome.best.best_level, 4);
        assert_eq!(outcome.best.best_successes, 15);

        let outcome = recorder.record(&stats(5, 1)).await;
        assert!(outcome.is_new_record);
        assert_eq!(outcome.best.best_level, 5);
        assert_eq!(outcome.best.best_successes, 15);
    }

    #[tokio::test]
    async fn test_zero_successes_on_empty_store_still_records_level() {
        let recorder = ScoreRecorder::in_memory();
        let outcome = recorder.record(&stats(1, 0)).await;
        assert!(outcome.is_new_record);
        assert_eq!(outcome.best.best_successes, 0);
        assert!(!recorder.save(&stats(1, 0)).await);
    }

    #[tokio::test]
    async fn test_read_failure_is_treated_as_absence() {
        let mut store = MockScoreStore::new();
        store
            .expect_get()
            .returning(|_| Err(StoreError::Unavailable("locked".into())));
        let recorder = ScoreRecorder::new(Arc::new(store));
        assert!(matches!(
            recorder.try_load().await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(recorder.load().await, ScoreRecord::default());
    }

    #[tokio::test]
    async fn test_malformed_record_is_treated_as_absence() {
        let mut store = MockScoreStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(json!({"best_level": "three"}))));
        let recorder = ScoreRecorder::new(Arc::new(store));
        assert_eq!(recorder.load().await, ScoreRecord::default());
    }

    #[tokio::test]
    async fn test_write_failure_reports_no_record() {
        let mut store = MockScoreStore::new();
        store.expect_get().returning(|_| {
            Ok(Some(json!({"best_level": 2, "best_successes": 4})))
        });
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StoreError::Unavailable("quota exceeded".into())));
        let recorder = ScoreRecorder::new(Arc::new(store));

        let outcome = recorder.record(&stats(6, 30)).await;
        assert!(!outcome.is_new_record);
        assert_eq!(outcome.best.best_level, 2);
        assert_eq!(outcome.best.best_successes, 4);
    }

    #[tokio::test]
    async fn test_non_improving_result_skips_write() {
        let mut store = MockScoreStore::new();
        store.expect_get().returning(|_| {
            Ok(Some(json!({"best_level": 9, "best_successes": 40})))
        });
        store.expect_set().never();
        let recorder = ScoreRecorder::new(Arc::new(store));
        assert!(!recorder.save(&stats(3, 11)).await);
    }

    #[tokio::test]
    async fn test_legacy_field_names_are_accepted() {
        let record: ScoreRecord =
            serde_json::from_value(json!({"bestLevel": 7, "bestSuccess": 31})).unwrap();
        assert_eq!(record.best_level, 7);
        assert_eq!(record.best_successes, 31);
        assert_eq!(record.updated_at, None);
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.json");
        let store = JsonFileStore::new(&path);

        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!({"x": true})).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("b").await.unwrap(), Some(json!({"x": true})));
        assert!(!path.with_extension("tmp").exists());

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_json_file_store_recovers_from_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("k").await, Err(StoreError::Json(_))));

        let recorder = ScoreRecorder::new(Arc::new(JsonFileStore::new(&path)));
        assert_eq!(recorder.load().await, ScoreRecord::default());
        assert!(recorder.save(&stats(2, 3)).await);
        assert_eq!(recorder.load().await.best_level, 2);
    }
}
