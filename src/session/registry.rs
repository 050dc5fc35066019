use std::collections::HashMap;
use std::fmt;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::data::ServerMessage;
use crate::game::{PlayerIdentity, SessionId};

pub type ConnectionSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct RegisteredConnection {
    player: PlayerIdentity,
    sender: ConnectionSender,
}

/// Live connections grouped by the session they are attached to.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<SessionId, HashMap<ConnectionId, RegisteredConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        session_id: SessionId,
        connection_id: ConnectionId,
        player: PlayerIdentity,
        sender: ConnectionSender,
    ) {
        self.sessions
            .write()
            .await
            .entry(session_id)
            .or_default()
            .insert(connection_id, RegisteredConnection { player, sender });
    }

    /// Removes the connection. Returns whether it was registered.
    pub async fn deregister(&self, session_id: SessionId, connection_id: ConnectionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(connections) = sessions.get_mut(&session_id) else {
            return false;
        };
        let removed = connections.remove(&connection_id).is_some();
        if connections.is_empty() {
            sessions.remove(&session_id);
        }
        removed
    }

    pub async fn connection_count(&self, session_id: SessionId) -> usize {
        self.sessions.read().await.get(&session_id).map_or(0, HashMap::len)
    }

    /// Sends directly to one connection. Returns false if it is gone.
    pub async fn send_to(&self, session_id: SessionId, connection_id: ConnectionId, message: ServerMessage) -> bool {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .and_then(|connections| connections.get(&connection_id))
            .is_some_and(|c| c.sender.send(message).is_ok())
    }
}
