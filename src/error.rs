use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::game::types::{GameError, SessionId};
use crate::trivia::UpstreamError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Session with ID {0} not found")]
    SessionNotFound(SessionId),

    #[error("Question source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Game logic violation: {0}")]
    Game(#[from] GameError),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        AppError::UpstreamUnavailable(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal database error occurred".to_string())
            }
            AppError::Serde(e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal serialization error occurred".to_string())
            }
            AppError::SessionNotFound(id) => {
                let body = Json(json!({
                    "error": format!("Session with id {} not found", id),
                    "redirect": "/sessions",
                }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::UpstreamUnavailable(reason) => {
                tracing::warn!("Question source unavailable: {}", reason);
                (StatusCode::SERVICE_UNAVAILABLE, "Could not fetch questions, please retry".to_string())
            }
            AppError::Game(GameError::NoMoreQuestions) => {
                (StatusCode::CONFLICT, GameError::NoMoreQuestions.to_string())
            }
            AppError::Game(e) => {
                tracing::warn!("Game logic violation: {}", e);
                (StatusCode::BAD_REQUEST, format!("Game rule violation: {}", e))
            }
            AppError::Timeout(what) => (StatusCode::GATEWAY_TIMEOUT, format!("Timed out waiting for {}", what)),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::PlayerIdentity;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::SessionNotFound(SessionId::new()), StatusCode::NOT_FOUND),
            (AppError::UpstreamUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Game(GameError::NoMoreQuestions), StatusCode::CONFLICT),
            (
                AppError::Game(GameError::PlayerNotInSession(PlayerIdentity::new("ghost"))),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Timeout("room"), StatusCode::GATEWAY_TIMEOUT),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
