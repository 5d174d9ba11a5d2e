//! Sessions
//!
//! One session per connection. It exclusively owns a world and an agent,
//! and runs at most one turn at a time: input arriving mid-turn is
//! rejected with a status message, never queued.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dream_agent::{
    ActionError, AgentOrchestrator, ChatProvider, MeshGenerator, Pricing, ToolDispatcher,
    MAX_CONTINUATIONS,
};
use dream_world::{WorldEngine, WorldState};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::protocol::ServerMessage;

pub const STATUS_THINKING: &str = "Imagining your world...";
pub const STATUS_BUSY: &str = "Still processing previous request...";
pub const STATUS_READY: &str = "Ready";
pub const STATUS_CONNECTED: &str = "Ready. Describe what you see...";

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session closed: {0}")]
    Closed(String),
}

/// Session identifier, taken from the connection path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the session ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session knobs
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Advisory world object cap
    pub max_objects: Option<usize>,
    /// Delay between consecutive action events
    pub action_pacing: Duration,
    pub pricing: Pricing,
    pub max_continuations: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_objects: Some(200),
            action_pacing: Duration::from_millis(100),
            pricing: Pricing::default(),
            max_continuations: MAX_CONTINUATIONS,
        }
    }
}

struct SessionCore {
    world: WorldEngine,
    agent: AgentOrchestrator,
}

/// Exclusive claim on a session's turn slot.
///
/// Taken synchronously when a frame is read and moved into the task that
/// runs the turn, so inputs are claimed in arrival order. The slot is
/// released when the permit drops, however the turn ends.
pub struct TurnPermit(Arc<AtomicBool>);

impl TurnPermit {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A connected user's world and conversation
pub struct Session {
    id: SessionId,
    busy: Arc<AtomicBool>,
    core: Mutex<SessionCore>,
    mesh: Arc<dyn MeshGenerator>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    action_pacing: Duration,
}

impl Session {
    /// Create a session with a fresh world and agent. Events are written to
    /// `outbound` in emission order.
    pub fn new(
        id: SessionId,
        provider: Arc<dyn ChatProvider>,
        mesh: Arc<dyn MeshGenerator>,
        settings: &SessionSettings,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let mut world = WorldEngine::new();
        if let Some(limit) = settings.max_objects {
            world = world.with_object_limit(limit);
        }
        let agent = AgentOrchestrator::new(provider, settings.pricing)
            .with_max_continuations(settings.max_continuations);

        Self {
            id,
            busy: Arc::new(AtomicBool::new(false)),
            core: Mutex::new(SessionCore { world, agent }),
            mesh,
            outbound,
            action_pacing: settings.action_pacing,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Send the snapshot and greeting a new connection starts with
    pub async fn send_initial_state(&self) {
        let snapshot = self.snapshot().await;
        let _ = self
            .send(ServerMessage::WorldState(snapshot))
            .and_then(|_| self.send(ServerMessage::status(STATUS_CONNECTED)));
    }

    /// Claim the session for a user input and announce the turn.
    ///
    /// Returns `None` after telling the client when a turn is already in
    /// flight; the input is dropped, not queued.
    pub fn begin_input(&self) -> Option<TurnPermit> {
        let permit = self.claim()?;
        self.send(ServerMessage::status(STATUS_THINKING)).ok()?;
        Some(permit)
    }

    /// Claim the session for a reset
    pub fn begin_reset(&self) -> Option<TurnPermit> {
        self.claim()
    }

    /// Process one user input as a full turn
    pub async fn process_input(&self, text: &str) {
        if let Some(permit) = self.begin_input() {
            self.run_input(permit, text).await;
        }
    }

    /// Run a turn already claimed with [`Session::begin_input`]
    pub async fn run_input(&self, permit: TurnPermit, text: &str) {
        if AssertUnwindSafe(self.run_turn(text)).catch_unwind().await.is_err() {
            log::error!("Turn processing panicked in session {}", self.id);
            let _ = self.send(ServerMessage::Error(ActionError {
                message: "An unexpected error occurred while processing your input".to_string(),
                name: None,
                success: None,
            }));
        }
        drop(permit);
    }

    /// Empty the world and forget the conversation. Cost totals are kept.
    pub async fn reset(&self) {
        if let Some(permit) = self.begin_reset() {
            self.run_reset(permit).await;
        }
    }

    /// Run a reset already claimed with [`Session::begin_reset`]
    pub async fn run_reset(&self, permit: TurnPermit) {
        let snapshot = {
            let mut core = self.core.lock().await;
            core.world.reset();
            core.agent.reset();
            core.world.snapshot()
        };
        log::info!("Session {} reset", self.id);
        let _ = self
            .send(ServerMessage::WorldState(snapshot))
            .and_then(|_| self.send(ServerMessage::status(STATUS_CONNECTED)));
        drop(permit);
    }

    /// Copy of the current world
    pub async fn snapshot(&self) -> WorldState {
        self.core.lock().await.world.snapshot()
    }

    async fn run_turn(&self, text: &str) {
        let (actions, cost) = {
            let mut core = self.core.lock().await;
            let SessionCore { world, agent } = &mut *core;
            world.increment_turn();
            let mut dispatcher = ToolDispatcher::new(world, self.mesh.as_ref());
            let actions = agent.run_turn(text, &mut dispatcher).await;
            (actions, agent.cost_summary())
        };

        if !actions.is_empty()
            && self
                .send(ServerMessage::status(format!("Building {} elements...", actions.len())))
                .is_err()
        {
            return;
        }

        for (i, action) in actions.into_iter().enumerate() {
            if i > 0 && !self.action_pacing.is_zero() {
                tokio::time::sleep(self.action_pacing).await;
            }
            if self.send(action.into()).is_err() {
                return;
            }
        }

        let _ = self.send(ServerMessage::status_with_cost(STATUS_READY, cost));
    }

    fn claim(&self) -> Option<TurnPermit> {
        let permit = TurnPermit::acquire(&self.busy);
        if permit.is_none() {
            log::info!("Session {} busy, dropping request", self.id);
            let _ = self.send(ServerMessage::status(STATUS_BUSY));
        }
        permit
    }

    fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        self.outbound.send(message).map_err(|_| {
            log::debug!("Session {} has no listener, dropping event", self.id);
            SessionError::Closed(self.id.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_permit_releases() {
        let flag = Arc::new(AtomicBool::new(false));
        {
            let _permit = TurnPermit::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::SeqCst));
            assert!(TurnPermit::acquire(&flag).is_none());
        }
        assert!(!flag.load(Ordering::SeqCst));
        assert!(TurnPermit::acquire(&flag).is_some());
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
    }
}
