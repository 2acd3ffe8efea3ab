//! Axum Handlers for the REST API
//!
//! Read-only endpoints around the game: liveness, the stored high score and
//! the command catalog. Gameplay itself runs over the WebSocket.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{CommandResponse, ErrorResponse, HealthResponse, HighScoreResponse},
    state::AppState,
};

pub enum ApiError {
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Get the best level and success count recorded on this server.
#[utoipa::path(
    get,
    path = "/scores",
    responses(
        (status = 200, description = "Current high score", body = HighScoreResponse),
        (status = 500, description = "Score store could not be read", body = ErrorResponse)
    )
)]
pub async fn get_scores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HighScoreResponse>, ApiError> {
    let record = state.scores.try_load().await?;
    Ok(Json(record.into()))
}

/// List the commands the game can issue, with their draw probabilities.
#[utoipa::path(
    get,
    path = "/commands",
    responses(
        (status = 200, description = "Command catalog", body = [CommandResponse])
    )
)]
pub async fn list_commands(State(state): State<Arc<AppState>>) -> Json<Vec<CommandResponse>> {
    Json(CommandResponse::list(&state.catalog))
}
