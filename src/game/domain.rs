use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::avatar::AvatarPicker;
use super::question::Question;
use super::types::{Avatar, GameError, PlayerIdentity, SessionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub session_id: PlayerIdentity,
    pub nickname: String,
    pub avatar: Avatar,
    pub current_guess: Option<String>,
}

impl Player {
    pub fn new(identity: PlayerIdentity, avatar: Avatar) -> Self {
        Self {
            session_id: identity,
            nickname: avatar.name.clone(),
            avatar,
            current_guess: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    id: SessionId,
    current_question: Question,
    question_pool: Vec<Question>,
    started_at: DateTime<Utc>,
    players: Vec<Player>,
}

impl GameSession {
    /// Builds a session from a fetched batch: the first question is asked
    /// immediately, the rest form the pool. `None` for an empty batch.
    pub fn from_batch(mut questions: Vec<Question>) -> Option<Self> {
        if questions.is_empty() {
            return None;
        }
        let current_question = questions.remove(0);

        Some(Self {
            id: SessionId::new(),
            current_question,
            question_pool: questions,
            started_at: Utc::now(),
            players: Vec::new(),
        })
    }

    // Getters
    pub fn get_id(&self) -> SessionId {
        self.id
    }

    pub fn get_current_question(&self) -> &Question {
        &self.current_question
    }

    pub fn get_question_pool(&self) -> &[Question] {
        &self.question_pool
    }

    pub fn get_started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn get_players(&self) -> &[Player] {
        &self.players
    }

    pub fn get_player(&self, identity: &PlayerIdentity) -> Option<&Player> {
        self.players.iter().find(|p| &p.session_id == identity)
    }

    pub fn has_player(&self, identity: &PlayerIdentity) -> bool {
        self.get_player(identity).is_some()
    }

    pub fn all_guessed(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.current_guess.is_some())
    }

    //  --- Public mutators ---
    // Each returns whether the session changed and needs persisting.

    /// Adds the player unless already present. Rejoining keeps the existing entry and guess.
    pub fn join(&mut self, identity: PlayerIdentity, avatars: &dyn AvatarPicker) -> bool {
        if self.has_player(&identity) {
            return false;
        }
        self.players.push(Player::new(identity, avatars.pick()));
        true
    }

    pub fn leave(&mut self, identity: &PlayerIdentity) -> bool {
        let before = self.players.len();
        self.players.retain(|p| &p.session_id != identity);
        self.players.len() != before
    }

    /// Records a guess; `value` may be an answer id or the answer text.
    pub fn set_guess(&mut self, identity: &PlayerIdentity, value: &str) -> Result<bool, GameError> {
        let answer = self
            .current_question
            .resolve_guess(value)
            .ok_or_else(|| GameError::UnknownAnswer(value.to_string()))?
            .to_string();
        let player = self.player_mut(identity)?;
        if player.current_guess.as_deref() == Some(answer.as_str()) {
            return Ok(false);
        }
        player.current_guess = Some(answer);
        Ok(true)
    }

    pub fn unset_guess(&mut self, identity: &PlayerIdentity) -> Result<bool, GameError> {
        let player = self.player_mut(identity)?;
        Ok(player.current_guess.take().is_some())
    }

    /// Moves the front of the pool into the current slot and clears every guess.
    /// Leaves the session untouched when the pool is empty.
    pub fn advance(&mut self) -> Result<(), GameError> {
        if self.question_pool.is_empty() {
            return Err(GameError::NoMoreQuestions);
        }
        self.current_question = self.question_pool.remove(0);
        for player in &mut self.players {
            player.current_guess = None;
        }
        Ok(())
    }

    //  --- Private helpers ---
    fn player_mut(&mut self, identity: &PlayerIdentity) -> Result<&mut Player, GameError> {
        self.players
            .iter_mut()
            .find(|p| &p.session_id == identity)
            .ok_or_else(|| GameError::PlayerNotInSession(identity.clone()))
    }
}
