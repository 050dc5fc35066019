use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use crate::config::GameConfig;
use crate::data::{session_key, SessionStore};
use crate::error::AppError;
use crate::game::{AvatarPicker, GameError, GameSession, PlayerIdentity, SessionId};
use crate::trivia::QuestionSource;

/// Per-session bookkeeping guarded by the session's lock.
#[derive(Debug, Default)]
struct SessionSlot {
    /// Live connections per player.
    connections: HashMap<PlayerIdentity, usize>,
}

/// Sole writer of session state.
///
/// Every operation loads the stored snapshot, applies one mutation and writes
/// the result back before returning it. Operations on the same session are
/// serialized through a per-session lock; different sessions only share a
/// read lock on the slot map.
pub struct GameSessionManager {
    store: Arc<dyn SessionStore>,
    questions: Arc<dyn QuestionSource>,
    avatars: Arc<dyn AvatarPicker>,
    game: GameConfig,
    slots: RwLock<HashMap<SessionId, Arc<Mutex<SessionSlot>>>>,
}

impl GameSessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        questions: Arc<dyn QuestionSource>,
        avatars: Arc<dyn AvatarPicker>,
        game: GameConfig,
    ) -> Self {
        Self {
            store,
            questions,
            avatars,
            game,
            slots: RwLock::new(HashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub async fn open_session(&self) -> Result<GameSession, AppError> {
        let batch = self
            .questions
            .fetch(self.game.questions_per_session, self.game.category, self.game.difficulty)
            .await?;

        let session = GameSession::from_batch(batch)
            .ok_or_else(|| AppError::UpstreamUnavailable("question source returned no questions".into()))?;
        self.save(&session).await?;

        tracing::info!(
            session_id = %session.get_id(),
            pool = session.get_question_pool().len(),
            "Session opened"
        );
        Ok(session)
    }

    #[instrument(skip(self))]
    pub async fn get_session(&self, id: SessionId) -> Result<GameSession, AppError> {
        let raw = self.store.get(&session_key(id)).await?.ok_or(AppError::SessionNotFound(id))?;

        serde_json::from_slice(&raw).map_err(|e| {
            tracing::warn!(session_id = %id, error = %e, "Stored session is undecodable");
            AppError::SessionNotFound(id)
        })
    }

    #[instrument(skip(self))]
    pub async fn join_session(&self, id: SessionId, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        self.lock(id).await.join(player).await
    }

    #[instrument(skip(self))]
    pub async fn leave_session(&self, id: SessionId, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        self.lock(id).await.leave(player).await
    }

    /// Fails with `PlayerNotInSession` for unknown players, persisting nothing.
    #[instrument(skip(self))]
    pub async fn set_player_guess(
        &self,
        id: SessionId,
        player: &PlayerIdentity,
        guess: &str,
    ) -> Result<GameSession, AppError> {
        self.lock(id).await.set_guess(player, guess).await
    }

    #[instrument(skip(self))]
    pub async fn unset_player_guess(&self, id: SessionId, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        self.lock(id).await.unset_guess(player).await
    }

    #[instrument(skip(self))]
    pub async fn advance_question(&self, id: SessionId) -> Result<GameSession, AppError> {
        self.lock(id).await.advance().await
    }

    /// Advances only if `question` is still current and every player still
    /// has a guess. `Ok(None)` when the condition no longer holds.
    #[instrument(skip(self))]
    pub async fn advance_if_all_guessed(
        &self,
        id: SessionId,
        question: &str,
    ) -> Result<Option<GameSession>, AppError> {
        self.lock(id).await.advance_if_all_guessed(question).await
    }

    /// Takes the session's lock. Everything done through the guard, including
    /// work the caller does between operations, is serialized with every other
    /// operation on the session.
    pub async fn lock(&self, id: SessionId) -> SessionGuard<'_> {
        let slot = self.slot_for(id).lock_owned().await;
        SessionGuard {
            manager: self,
            id,
            slot: Some(slot),
        }
    }

    fn slot_for(&self, id: SessionId) -> Arc<Mutex<SessionSlot>> {
        if let Some(slot) = self.slots.read().unwrap_or_else(PoisonError::into_inner).get(&id) {
            return slot.clone();
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_default()
            .clone()
    }

    // Only the map itself references an idle slot, so it can go.
    fn release_slot(&self, id: SessionId) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&id);
        }
    }

    async fn save(&self, session: &GameSession) -> Result<(), AppError> {
        let raw = serde_json::to_vec(session)?;
        self.store.set(&session_key(session.get_id()), raw).await
    }
}

/// Exclusive access to one session until dropped.
pub struct SessionGuard<'a> {
    manager: &'a GameSessionManager,
    id: SessionId,
    slot: Option<OwnedMutexGuard<SessionSlot>>,
}

impl SessionGuard<'_> {
    pub async fn snapshot(&self) -> Result<GameSession, AppError> {
        self.manager.get_session(self.id).await
    }

    pub async fn join(&mut self, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        let manager = self.manager;
        self.apply(|session| Ok(session.join(player.clone(), manager.avatars.as_ref())))
            .await
    }

    pub async fn leave(&mut self, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        self.apply(|session| Ok(session.leave(player))).await
    }

    pub async fn set_guess(&mut self, player: &PlayerIdentity, guess: &str) -> Result<GameSession, AppError> {
        self.apply(|session| session.set_guess(player, guess)).await
    }

    pub async fn unset_guess(&mut self, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        self.apply(|session| session.unset_guess(player)).await
    }

    pub async fn advance(&mut self) -> Result<GameSession, AppError> {
        self.apply(|session| session.advance().map(|_| true)).await
    }

    pub async fn advance_if_all_guessed(&mut self, question: &str) -> Result<Option<GameSession>, AppError> {
        let mut stale = false;
        let session = self
            .apply(|session| {
                if session.get_current_question().text != question || !session.all_guessed() {
                    stale = true;
                    return Ok(false);
                }
                session.advance().map(|_| true)
            })
            .await?;

        Ok((!stale).then_some(session))
    }

    /// Joins `player` and counts one more live connection for them.
    pub async fn connect(&mut self, player: &PlayerIdentity) -> Result<GameSession, AppError> {
        let session = self.join(player).await?;
        if let Some(slot) = self.slot.as_mut() {
            *slot.connections.entry(player.clone()).or_default() += 1;
        }
        Ok(session)
    }

    /// Drops one of `player`'s live connections. The player leaves only when
    /// it was their last one; otherwise `Ok(None)`.
    pub async fn disconnect(&mut self, player: &PlayerIdentity) -> Result<Option<GameSession>, AppError> {
        if let Some(slot) = self.slot.as_mut() {
            let remaining = slot.connections.remove(player).unwrap_or(0).saturating_sub(1);
            if remaining > 0 {
                slot.connections.insert(player.clone(), remaining);
                return Ok(None);
            }
        }
        self.leave(player).await.map(Some)
    }

    pub fn connections(&self, player: &PlayerIdentity) -> usize {
        self.slot
            .as_ref()
            .and_then(|slot| slot.connections.get(player).copied())
            .unwrap_or(0)
    }

    /// `apply` returns whether anything changed; unchanged sessions are not rewritten.
    async fn apply<F>(&mut self, apply: F) -> Result<GameSession, AppError>
    where
        F: FnOnce(&mut GameSession) -> Result<bool, GameError>,
    {
        let mut session = self.manager.get_session(self.id).await?;
        if apply(&mut session)? {
            self.manager.save(&session).await?;
        }
        Ok(session)
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let idle = self.slot.take().is_some_and(|slot| slot.connections.is_empty());
        if idle {
            self.manager.release_slot(self.id);
        }
    }
}
