// src/session/registry.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use super::{SessionEvent, SessionHandle};

/// A session stuck in `Submitting` with no retry for this long is dropped.
pub const STALLED_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Live sessions of this process, keyed by session id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly spawned session and drains its events into the log.
    pub async fn insert(
        &self,
        handle: SessionHandle,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let id = handle.id();
        let user_id = handle.user_id().to_string();
        self.inner.write().await.insert(id, handle);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match &event {
                    SessionEvent::Errored { message } => {
                        tracing::warn!("Session {} (user {}): {}", id, user_id, message);
                    }
                    _ => tracing::info!("Session {} (user {}): {:?}", id, user_id, event),
                }
            }
        });
    }

    /// Looks up a session owned by `user_id`. Other users' sessions are invisible.
    pub async fn get(&self, id: Uuid, user_id: &str) -> Option<SessionHandle> {
        self.inner
            .read()
            .await
            .get(&id)
            .filter(|h| h.user_id() == user_id)
            .cloned()
    }

    /// An unfinished session the user already has open for this test, if any.
    pub async fn find_live(&self, user_id: &str, test_id: &str) -> Option<SessionHandle> {
        self.inner
            .read()
            .await
            .values()
            .find(|h| h.user_id() == user_id && h.test_id() == test_id && h.is_live())
            .cloned()
    }

    /// Drops the registry's handle. Once no request holds a clone, the session
    /// task stops and its countdown with it.
    pub async fn remove(&self, id: Uuid, user_id: &str) -> bool {
        let mut sessions = self.inner.write().await;
        match sessions.get(&id) {
            Some(h) if h.user_id() == user_id => sessions.remove(&id).is_some(),
            _ => false,
        }
    }

    /// Forgets sessions whose task has finished, and sessions whose write
    /// failed and were left without a retry for [`STALLED_SUBMISSION_TIMEOUT`].
    /// Dropping the last handle of a stalled session stops its task.
    pub async fn prune_finished(&self) -> usize {
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|id, h| {
            if h.is_stalled(STALLED_SUBMISSION_TIMEOUT) {
                tracing::info!(
                    "Dropping session {} (user {}): submission never retried",
                    id,
                    h.user_id()
                );
                return false;
            }
            h.is_live()
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
