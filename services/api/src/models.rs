//! REST Models
//!
//! Response bodies of the HTTP API, annotated for OpenAPI generation with
//! `utoipa`. Engine types are flattened into plain fields here so the core
//! crate stays free of web concerns.

use chrono::{DateTime, Utc};
use flagcall_core::{Catalog, CommandKind, FlagCommand, ScoreRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The best game recorded on this server.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HighScoreResponse {
    #[schema(example = 3)]
    pub best_level: u32,
    #[schema(example = 17)]
    pub best_successes: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ScoreRecord> for HighScoreResponse {
    fn from(record: ScoreRecord) -> Self {
        Self {
            best_level: record.best_level,
            best_successes: record.best_successes,
            updated_at: record.updated_at,
        }
    }
}

/// One entry of the command catalog.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CommandResponse {
    #[schema(example = "청기 올려")]
    pub text: String,
    #[schema(example = "left_raised")]
    pub expected_pose: String,
    /// `raise` when the player must strike the pose, `hold` when they must
    /// stay neutral until time runs out.
    #[schema(example = "raise")]
    pub kind: String,
    #[schema(example = 35)]
    pub weight: u32,
    /// Chance of this command being drawn, between 0 and 1.
    #[schema(example = 0.35)]
    pub probability: f64,
}

impl CommandResponse {
    fn from_command(command: &FlagCommand, total_weight: u64) -> Self {
        let kind = match command.kind {
            CommandKind::Raise => "raise",
            CommandKind::Hold => "hold",
        };
        Self {
            text: command.text.clone(),
            expected_pose: command.expected_pose.to_string(),
            kind: kind.to_string(),
            weight: command.weight,
            probability: f64::from(command.weight) / total_weight as f64,
        }
    }

    pub fn list(catalog: &Catalog) -> Vec<Self> {
        let total = catalog.total_weight();
        catalog
            .commands()
            .iter()
            .map(|command| Self::from_command(command, total))
            .collect()
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
