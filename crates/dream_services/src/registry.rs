//! Session registry
//!
//! Keyed session lifecycle. Each session gets its own world and agent wired
//! from the shared provider and mesh generator; no registry operation ever
//! touches more than one session's state.

use std::collections::HashMap;
use std::sync::Arc;

use dream_agent::{ChatProvider, MeshGenerator};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;
use crate::session::{Session, SessionError, SessionId, SessionSettings};

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Total sessions created
    pub total_created: u64,
    /// Total sessions removed
    pub total_removed: u64,
    /// Peak concurrent sessions
    pub peak_sessions: usize,
}

/// Session registry
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Arc<Session>>,
    provider: Arc<dyn ChatProvider>,
    mesh: Arc<dyn MeshGenerator>,
    settings: SessionSettings,
    stats: RegistryStats,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        mesh: Arc<dyn MeshGenerator>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            provider,
            mesh,
            settings,
            stats: RegistryStats::default(),
        }
    }

    /// Create a session. A live session with the same id is replaced.
    pub fn create(
        &mut self,
        id: SessionId,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Arc<Session> {
        let session = Arc::new(Session::new(
            id.clone(),
            self.provider.clone(),
            self.mesh.clone(),
            &self.settings,
            outbound,
        ));

        if self.sessions.insert(id.clone(), session.clone()).is_some() {
            log::warn!("Replaced existing session: {}", id);
            self.stats.total_removed += 1;
        }

        self.stats.total_created += 1;
        if self.sessions.len() > self.stats.peak_sessions {
            self.stats.peak_sessions = self.sessions.len();
        }

        log::info!("Session created: {}", id);
        session
    }

    /// Get a session
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).cloned()
    }

    /// Remove a session by id
    pub fn remove(&mut self, id: &SessionId) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        self.stats.total_removed += 1;
        log::info!("Session removed: {}", id);
        Ok(session)
    }

    /// Remove `session` only if it is still the one registered under its id.
    ///
    /// A reconnect under the same id replaces the entry; the old connection's
    /// cleanup must not evict its successor.
    pub fn release(&mut self, session: &Arc<Session>) -> bool {
        let current = self
            .sessions
            .get(session.id())
            .map_or(false, |registered| Arc::ptr_eq(registered, session));
        current && self.remove(session.id()).is_ok()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// List all session IDs
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }

    /// Get statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}

/// Thread-safe registry handle
#[derive(Clone)]
pub struct SharedSessionRegistry {
    inner: Arc<RwLock<SessionRegistry>>,
}

impl SharedSessionRegistry {
    /// Wrap a registry
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Get a read lock
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, SessionRegistry> {
        self.inner.read()
    }

    /// Get a write lock
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, SessionRegistry> {
        self.inner.write()
    }
}
