//! Live sessions of this process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::lifecycle::Lifecycle;

/// Table entry for one open session.
pub struct SessionHandle {
    pub session_id: String,
    pub lifecycle: Arc<Lifecycle>,
}

impl SessionHandle {
    pub(crate) const fn new(session_id: String, lifecycle: Arc<Lifecycle>) -> Self {
        Self {
            session_id,
            lifecycle,
        }
    }
}

/// Thread-safe table of open sessions.
#[derive(Clone, Default)]
pub struct SessionTable {
    sessions: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: Arc<SessionHandle>) {
        let session_id = handle.session_id.clone();
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), handle);
        info!(session_id = %session_id, "Session registered");
    }

    pub async fn unregister(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let handle = self.sessions.write().await.remove(session_id);
        if handle.is_some() {
            info!(session_id = %session_id, "Session unregistered");
        } else {
            warn!(session_id = %session_id, "Tried to unregister unknown session");
        }
        handle
    }

    /// Snapshot of the open sessions.
    pub async fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
