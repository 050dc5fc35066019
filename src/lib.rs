pub mod config;
pub mod data;
pub mod error;
pub mod game;
pub mod handlers;
pub mod render;
pub mod session;
pub mod state;
pub mod trivia;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use crate::config::{Config, StoreBackend};
use handlers::{rest, ws};
use state::{AppState, SharedState};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::data::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::error::AppError;
use crate::game::ThreadRngAvatarPicker;
use crate::session::GameSessionManager;
use crate::trivia::OpenTriviaDb;

/// Wires the store, question source and session manager described by `config`.
pub fn build_state(config: Config) -> Result<SharedState, AppError> {
    let store: Arc<dyn SessionStore> = match config.database.backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.database.redis_url.clone())?;
            Arc::new(RedisSessionStore::new(client, config.database.session_ttl_secs))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions will not survive a restart");
            Arc::new(InMemorySessionStore::new())
        }
    };
    let questions = Arc::new(OpenTriviaDb::new(&config.trivia)?);

    let sessions = GameSessionManager::new(store, questions, Arc::new(ThreadRngAvatarPicker), config.game.clone());
    Ok(Arc::new(AppState::new(sessions, config)))
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/sessions", post(rest::create_session_handler))
        .route("/sessions/{id}", get(rest::get_session_handler))
        .route("/ws/sessions/{id}", get(ws::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(cors)
}

pub fn create_app(config: Config) -> Result<Router, AppError> {
    Ok(router(build_state(config)?))
}
