//! # Dream Services
//!
//! Session layer for Dreamscape.
//!
//! - [`protocol`]: the `{type, data}` JSON envelopes exchanged with clients
//! - [`session`]: one world plus one agent per connection, one turn at a time
//! - [`registry`]: keyed session lifecycle
//! - [`server`]: TCP listener and WebSocket bridge
//!
//! ## Usage
//!
//! ```ignore
//! let registry = SharedSessionRegistry::new(SessionRegistry::new(
//!     provider,
//!     Arc::new(DisabledMeshGenerator),
//!     SessionSettings::default(),
//! ));
//!
//! let server = DreamServer::bind("0.0.0.0", 8000, registry).await?;
//! server.run().await?;
//! ```

pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use protocol::{ClientMessage, ServerMessage, StatusPayload};
pub use registry::{RegistryStats, SessionRegistry, SharedSessionRegistry};
pub use server::{session_id_from_path, DreamServer, ServerError, ServerResult};
pub use session::{
    Session, SessionError, SessionId, SessionSettings, TurnPermit, STATUS_BUSY, STATUS_CONNECTED,
    STATUS_READY, STATUS_THINKING,
};
