use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::game::SessionId;

/// Fires when the countdown is cancelled or superseded.
pub type CancelSignal = oneshot::Receiver<()>;

struct PendingCountdown {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// One pending countdown slot per session.
#[derive(Default)]
pub struct CountdownService {
    pending: Mutex<HashMap<SessionId, PendingCountdown>>,
}

impl CountdownService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `chain` as the session's countdown, cancelling whatever was pending.
    pub async fn start<F, Fut>(&self, session_id: SessionId, chain: F)
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, cancelled) = oneshot::channel();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, countdown| !countdown.handle.is_finished());

        let handle = tokio::spawn(chain(cancelled));
        if let Some(previous) = pending.insert(session_id, PendingCountdown { cancel, handle }) {
            let _ = previous.cancel.send(());
            tracing::debug!(session_id = %session_id, "Superseded pending countdown");
        }
    }

    /// Cancels the session's countdown if one is running. Safe to call at any time.
    pub async fn cancel(&self, session_id: SessionId) -> bool {
        let Some(countdown) = self.pending.lock().await.remove(&session_id) else {
            return false;
        };
        let was_running = !countdown.handle.is_finished();
        let _ = countdown.cancel.send(());
        if was_running {
            tracing::debug!(session_id = %session_id, "Cancelled pending countdown");
        }
        was_running
    }

    pub async fn is_pending(&self, session_id: SessionId) -> bool {
        self.pending
            .lock()
            .await
            .get(&session_id)
            .is_some_and(|countdown| !countdown.handle.is_finished())
    }
}

/// Sleeps for `delay` unless cancelled first. Returns false when cancelled.
pub async fn wait_or_cancel(delay: Duration, cancelled: &mut CancelSignal) -> bool {
    tokio::select! {
        biased;
        _ = cancelled => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn counting_chain(fired: Arc<AtomicUsize>, mut cancelled: CancelSignal) {
        if wait_or_cancel(Duration::from_secs(5), &mut cancelled).await {
            fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_fires_after_delay() {
        let service = CountdownService::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SessionId::new();

        service.start(id, |c| counting_chain(fired.clone(), c)).await;
        assert!(service.is_pending(id).await);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!service.is_pending(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing_and_is_idempotent() {
        let service = CountdownService::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SessionId::new();

        assert!(!service.cancel(id).await);
        service.start(id, |c| counting_chain(fired.clone(), c)).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(service.cancel(id).await);
        assert!(!service.cancel(id).await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_supersedes_previous_countdown() {
        let service = CountdownService::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let id = SessionId::new();

        service.start(id, |c| counting_chain(first.clone(), c)).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        service.start(id, |c| counting_chain(second.clone(), c)).await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_completion_is_noop() {
        let service = CountdownService::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let id = SessionId::new();

        service.start(id, |c| counting_chain(fired.clone(), c)).await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(!service.cancel(id).await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
