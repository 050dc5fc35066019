use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::game::{GameSession, SessionId};

/// A state change within one session, carrying the snapshot it produced.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PlayerJoined(Arc<GameSession>),
    PlayerLeft(Arc<GameSession>),
    GuessSet(Arc<GameSession>),
    GuessUnset(Arc<GameSession>),
    AnswersRevealed(Arc<GameSession>),
    NextQuestion(Arc<GameSession>),
    QuestionsExhausted(Arc<GameSession>),
}

impl SessionEvent {
    pub fn snapshot(&self) -> &GameSession {
        match self {
            SessionEvent::PlayerJoined(s)
            | SessionEvent::PlayerLeft(s)
            | SessionEvent::GuessSet(s)
            | SessionEvent::GuessUnset(s)
            | SessionEvent::AnswersRevealed(s)
            | SessionEvent::NextQuestion(s)
            | SessionEvent::QuestionsExhausted(s) => s,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.snapshot().get_id()
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PlayerJoined(_) => "player-joined",
            SessionEvent::PlayerLeft(_) => "player-left",
            SessionEvent::GuessSet(_) => "guess-set",
            SessionEvent::GuessUnset(_) => "guess-unset",
            SessionEvent::AnswersRevealed(_) => "answers-revealed",
            SessionEvent::NextQuestion(_) => "next-question",
            SessionEvent::QuestionsExhausted(_) => "questions-exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<SessionEvent>,
}

/// Receiving end of a per-session channel.
pub struct Subscription {
    pub id: SubscriptionId,
    pub session_id: SessionId,
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.receiver.recv().await
    }
}

/// Per-session publish/subscribe.
///
/// Each session has its own topic. Looking a topic up only takes the shared
/// map's read lock, and a publish fans out under the topic's own lock, so
/// sessions never wait on each other. Each subscriber owns an unbounded
/// queue: a publish reaches every current subscriber in publish order and a
/// slow or dead subscriber never holds up the others.
#[derive(Default)]
pub struct EventBus {
    topics: RwLock<HashMap<SessionId, Topic>>,
    next_id: AtomicU64,
}

type Topic = Arc<Mutex<Vec<Subscriber>>>;

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, session_id: SessionId) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        let topic = self.topic_or_create(session_id).await;
        topic.lock().await.push(Subscriber { id, sender });

        Subscription { id, session_id, receiver }
    }

    pub async fn unsubscribe(&self, session_id: SessionId, id: SubscriptionId) {
        let Some(topic) = self.topic(session_id).await else {
            return;
        };
        let empty = {
            let mut subscribers = topic.lock().await;
            subscribers.retain(|s| s.id != id);
            subscribers.is_empty()
        };
        drop(topic);
        if empty {
            self.prune(session_id).await;
        }
    }

    /// Delivers `event` to every subscriber of its session. Returns how many received it.
    pub async fn publish(&self, event: SessionEvent) -> usize {
        let session_id = event.session_id();
        let Some(topic) = self.topic(session_id).await else {
            tracing::debug!(session_id = %session_id, event = event.name(), "No subscribers");
            return 0;
        };

        let delivered = {
            let mut subscribers = topic.lock().await;
            subscribers.retain(|s| s.sender.send(event.clone()).is_ok());
            subscribers.len()
        };
        drop(topic);
        if delivered == 0 {
            self.prune(session_id).await;
        }

        tracing::debug!(session_id = %session_id, event = event.name(), delivered, "Published event");
        delivered
    }

    pub async fn subscriber_count(&self, session_id: SessionId) -> usize {
        match self.topic(session_id).await {
            Some(topic) => topic.lock().await.len(),
            None => 0,
        }
    }

    async fn topic(&self, session_id: SessionId) -> Option<Topic> {
        self.topics.read().await.get(&session_id).cloned()
    }

    async fn topic_or_create(&self, session_id: SessionId) -> Topic {
        if let Some(topic) = self.topic(session_id).await {
            return topic;
        }
        self.topics.write().await.entry(session_id).or_default().clone()
    }

    // Removes the topic once nobody holds it and it has no subscribers left.
    async fn prune(&self, session_id: SessionId) {
        let mut topics = self.topics.write().await;
        let Some(topic) = topics.get(&session_id) else {
            return;
        };
        if Arc::strong_count(topic) == 1 && topic.lock().await.is_empty() {
            topics.remove(&session_id);
        }
    }
}
