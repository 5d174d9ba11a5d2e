//! WebSocket connection server
//!
//! Accepts TCP connections, upgrades them at `/ws/<session_id>`, and bridges
//! each socket to its session: a writer task drains the session's outbound
//! queue while the read loop turns client frames into session calls.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::SharedSessionRegistry;
use crate::session::{Session, SessionId};

/// Path prefix of the session endpoint
pub const WS_PATH_PREFIX: &str = "/ws/";

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid server configuration: {0}")]
    Config(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Extract the session id from a request path like `/ws/abc123?x=1`
pub fn session_id_from_path(path: &str) -> Option<SessionId> {
    let rest = path.strip_prefix(WS_PATH_PREFIX)?;
    let id = rest.split('?').next().unwrap_or_default().trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(SessionId::new(id))
}

/// Accepts connections and hands each one its own session
pub struct DreamServer {
    listener: TcpListener,
    registry: SharedSessionRegistry,
}

impl DreamServer {
    /// Bind to `host:port`
    pub async fn bind(host: &str, port: u16, registry: SharedSessionRegistry) -> ServerResult<Self> {
        if host.trim().is_empty() {
            return Err(ServerError::Config("host must not be empty".to_string()));
        }
        let listener = TcpListener::bind((host, port)).await?;
        Ok(Self { listener, registry })
    }

    /// Address actually bound; useful with port 0
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> ServerResult<()> {
        log::info!("Listening on ws://{}{}<session_id>", self.local_addr()?, WS_PATH_PREFIX);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let registry = self.registry.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, registry).await {
                    log::warn!("Connection from {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Not Found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SharedSessionRegistry,
) -> ServerResult<()> {
    let mut requested = None;
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        match session_id_from_path(req.uri().path()) {
            Some(id) => {
                requested = Some(id);
                Ok(resp)
            }
            None => {
                log::debug!("Rejecting {} request for {}", peer, req.uri().path());
                Err(not_found())
            }
        }
    })
    .await
    .map_err(|e| ServerError::Handshake(e.to_string()))?;

    let id = requested.ok_or_else(|| ServerError::Handshake("no session id".to_string()))?;
    let (mut write, mut read) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let session = registry.write().create(id.clone(), tx);
    log::info!("Session started: {} ({})", id, peer);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    log::error!("Failed to encode server message: {}", e);
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    session.send_initial_state().await;

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&session, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Receive failed for session {}: {}", id, e);
                break;
            }
        }
    }

    registry.write().release(&session);
    writer.abort();
    log::info!("Session disconnected: {}", id);
    Ok(())
}

fn handle_frame(session: &Arc<Session>, frame: &str) {
    match ClientMessage::decode(frame) {
        Ok(ClientMessage::UserInput { text }) => {
            if text.trim().is_empty() {
                return;
            }
            // Claimed here, in frame order, before the turn is spawned
            if let Some(permit) = session.begin_input() {
                let session = session.clone();
                tokio::spawn(async move { session.run_input(permit, &text).await });
            }
        }
        Ok(ClientMessage::Reset) => {
            if let Some(permit) = session.begin_reset() {
                let session = session.clone();
                tokio::spawn(async move { session.run_reset(permit).await });
            }
        }
        Err(e) => log::warn!("Ignoring undecodable frame for session {}: {}", session.id(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_from_path() {
        assert_eq!(session_id_from_path("/ws/abc123"), Some(SessionId::new("abc123")));
        assert_eq!(session_id_from_path("/ws/abc123?token=x"), Some(SessionId::new("abc123")));
        assert_eq!(session_id_from_path("/ws/abc123/"), Some(SessionId::new("abc123")));
        assert_eq!(session_id_from_path("/ws/"), None);
        assert_eq!(session_id_from_path("/ws/a/b"), None);
        assert_eq!(session_id_from_path("/api/health"), None);
    }

    #[test]
    fn test_not_found_response() {
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
    }
}
