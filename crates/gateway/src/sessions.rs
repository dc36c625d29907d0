//! Session registry - the set of currently open bidirectional channels.
//!
//! The registry is an owned object with an explicit lifecycle: created at
//! process start, passed by `Arc`, no teardown ordering dependency on
//! in-flight work. `register`/`unregister` are idempotent; delivery to a
//! dead channel unregisters it lazily instead of raising; `broadcast`
//! collects failures without letting one abort delivery to the rest.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use wealthdesk_core::event::{EventSink, OutboundEvent};

/// Central registry of open sessions, keyed by session id.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, mpsc::Sender<OutboundEvent>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session's outbound queue. Re-registering the same id
    /// replaces the queue.
    pub async fn register(&self, session_id: &str, tx: mpsc::Sender<OutboundEvent>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), tx);
        info!(session = %session_id, open = sessions.len(), "Session registered");
    }

    /// Remove a session. A second call for the same id is a no-op.
    pub async fn unregister(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            info!(session = %session_id, open = sessions.len(), "Session unregistered");
        }
    }

    /// Deliver one event to one session. Unknown or dead sessions are
    /// dropped silently (dead ones are unregistered lazily).
    pub async fn send_to(&self, session_id: &str, event: OutboundEvent) {
        let tx = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned()
        };
        let Some(tx) = tx else {
            debug!(session = %session_id, "Dropping event for unknown session");
            return;
        };
        if tx.send(event).await.is_err() {
            self.unregister(session_id).await;
        }
    }

    /// Deliver one event to every session, unregistering any that fail.
    pub async fn broadcast(&self, event: OutboundEvent) {
        let targets: Vec<(String, mpsc::Sender<OutboundEvent>)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (id, tx) in targets {
            if tx.send(event.clone()).await.is_err() {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in dead {
                sessions.remove(&id);
            }
        }
    }

    /// Number of open sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Event sink bound to one registered session. Emitting to a closed
/// session is a silent drop - a disconnected channel never stops the
/// backing work.
pub struct SessionSink {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl SessionSink {
    pub fn new(registry: Arc<SessionRegistry>, session_id: impl Into<String>) -> Self {
        Self {
            registry,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl EventSink for SessionSink {
    async fn emit(&self, event: OutboundEvent) {
        self.registry.send_to(&self.session_id, event).await;
    }
}
