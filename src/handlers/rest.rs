use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::{
    data::CreateSessionResponse,
    error::AppError,
    game::{GameSession, SessionId},
    state::SharedState,
};

// ==============================================================================
// === REST API Handlers
// =============================================================================

/// Opens a new room. Gives up once the configured wait for questions elapses.
#[instrument(skip(state))]
pub async fn create_session_handler(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    tracing::info!("Attempting to open session");

    let session = tokio::time::timeout(state.config.game.open_timeout(), state.sessions.open_session())
        .await
        .map_err(|_| AppError::Timeout("the room to be ready"))??;
    let session_id = session.get_id();

    let response = CreateSessionResponse {
        session_id,
        websocket_url: format!("/ws/sessions/{}", session_id),
    };

    tracing::info!(session_id = %session_id, "Session created successfully");
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state))]
pub async fn get_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<GameSession>, AppError> {
    let session = state.sessions.get_session(session_id).await?;
    Ok(Json(session))
}
