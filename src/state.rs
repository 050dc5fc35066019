use std::sync::Arc;

use crate::config::Config;
use crate::session::{ConnectionRegistry, CountdownService, EventBus, GameSessionManager};

/// Process-wide state, built once at startup and shared with every handler.
pub struct AppState {
    pub sessions: GameSessionManager,
    pub registry: ConnectionRegistry,
    pub bus: EventBus,
    pub countdowns: CountdownService,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(sessions: GameSessionManager, config: Config) -> Self {
        Self {
            sessions,
            registry: ConnectionRegistry::new(),
            bus: EventBus::new(),
            countdowns: CountdownService::new(),
            config: Arc::new(config),
        }
    }
}

pub type SharedState = Arc<AppState>;
