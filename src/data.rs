use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::error::AppError;
use crate::game::SessionId;
use crate::render::View;

// --- DTOs (Data Transfer Objects) ---
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub websocket_url: String,
}

/// Commands a player sends over the websocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value")]
pub enum ClientMessage {
    SetGuess(String),
    UnsetGuess,
}

/// Everything pushed to a connected player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    Render(View),
    Error { message: String },
    Redirect { to: String },
}

// --- Session Store ---
pub fn session_key(id: SessionId) -> String {
    format!("session:{}", id)
}

/// Byte-oriented key/value persistence for session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AppError>;
}

pub struct RedisSessionStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<Vec<u8>> = conn.get(key).await?;
        Ok(raw)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, self.ttl_secs).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), AppError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_client_message_wire_format() {
        let set: ClientMessage = serde_json::from_str(r#"{"command":"SetGuess","value":"abc"}"#).unwrap();
        assert_eq!(set, ClientMessage::SetGuess("abc".to_string()));

        let unset: ClientMessage = serde_json::from_str(r#"{"command":"UnsetGuess"}"#).unwrap();
        assert_eq!(unset, ClientMessage::UnsetGuess);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"command":"Roll"}"#).is_err());
    }

    #[test]
    fn test_server_message_is_tagged() {
        let msg = ServerMessage::Error { message: "nope".into() };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"]["message"], "nope");
    }

    #[tokio::test]
    async fn test_in_memory_store_get_set() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("session:x").await.unwrap(), None);

        store.set("session:x", b"one".to_vec()).await.unwrap();
        store.set("session:x", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("session:x").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    #[serial]
    #[ignore = "requires a Redis server on 127.0.0.1:6379"]
    async fn test_redis_store_roundtrip() {
        let client = redis::Client::open("redis://127.0.0.1:6379/").unwrap();
        let store = RedisSessionStore::new(client, 60);
        let key = session_key(SessionId::new());

        assert_eq!(store.get(&key).await.unwrap(), None);
        store.set(&key, b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(b"{}".to_vec()));
    }
}
