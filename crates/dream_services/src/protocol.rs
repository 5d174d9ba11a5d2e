//! Real-time wire protocol
//!
//! Every frame is a JSON envelope `{type, data}`.

use dream_agent::{Action, ActionError, CostSummary, ModelPlacement};
use dream_world::{EnvironmentSettings, TerrainPatch, WorldObject, WorldState};
use serde::{Deserialize, Serialize};

/// Client → server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Something the user said
    UserInput { text: String },
    /// Start over with an empty world and a fresh conversation
    Reset,
}

impl ClientMessage {
    /// Decode one text frame
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Payload of a `status` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostSummary>,
}

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot, sent on connect and after a reset
    WorldState(WorldState),
    Status(StatusPayload),
    ObjectCreated(WorldObject),
    ObjectModified(WorldObject),
    ObjectRemoved { name: String, success: bool },
    EnvironmentUpdated(EnvironmentSettings),
    TerrainCreated(TerrainPatch),
    ModelUploaded(ModelPlacement),
    Narration { text: String },
    Error(ActionError),
}

impl ServerMessage {
    /// Status line without cost
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status(StatusPayload {
            message: message.into(),
            cost: None,
        })
    }

    /// Status line carrying the session's running cost
    pub fn status_with_cost(message: impl Into<String>, cost: CostSummary) -> Self {
        Self::Status(StatusPayload {
            message: message.into(),
            cost: Some(cost),
        })
    }
}

impl From<Action> for ServerMessage {
    fn from(action: Action) -> Self {
        match action {
            Action::ObjectCreated(object) => Self::ObjectCreated(object),
            Action::ObjectModified(object) => Self::ObjectModified(object),
            Action::ObjectRemoved { name } => Self::ObjectRemoved {
                name,
                success: true,
            },
            Action::EnvironmentUpdated(env) => Self::EnvironmentUpdated(env),
            Action::TerrainCreated(terrain) => Self::TerrainCreated(terrain),
            Action::Narration { text } => Self::Narration { text },
            Action::ModelUploaded(model) => Self::ModelUploaded(model),
            Action::Error(err) => Self::Error(err),
        }
    }
}
