//! Actions - the orchestrator's unit of output
//!
//! An action is one discrete effect of a turn, destined for exactly one
//! client event. Actions are never stored.

use std::fmt;

use dream_world::{EnvironmentSettings, TerrainPatch, Vector3, WorldObject};
use serde::{Deserialize, Serialize};

use crate::mesh::GeneratedFile;

/// Action discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ObjectCreated,
    ObjectModified,
    ObjectRemoved,
    EnvironmentUpdated,
    TerrainCreated,
    Narration,
    ModelUploaded,
    Error,
}

impl ActionKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectCreated => "object_created",
            Self::ObjectModified => "object_modified",
            Self::ObjectRemoved => "object_removed",
            Self::EnvironmentUpdated => "environment_updated",
            Self::TerrainCreated => "terrain_created",
            Self::Narration => "narration",
            Self::ModelUploaded => "model_uploaded",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    pub message: String,
    /// Object the failed call targeted, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Present on a failed removal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// A generated mesh and where to put it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPlacement {
    pub object_name: String,
    /// URL of the primary mesh file
    pub url: String,
    pub filename: String,
    /// Every file the generator produced
    pub files: Vec<GeneratedFile>,
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

/// One effect of a turn
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ObjectCreated(WorldObject),
    ObjectModified(WorldObject),
    ObjectRemoved { name: String },
    EnvironmentUpdated(EnvironmentSettings),
    TerrainCreated(TerrainPatch),
    Narration { text: String },
    ModelUploaded(ModelPlacement),
    Error(ActionError),
}

impl Action {
    /// Plain error with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ActionError {
            message: message.into(),
            name: None,
            success: None,
        })
    }

    /// Get the action kind
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::ObjectCreated(_) => ActionKind::ObjectCreated,
            Self::ObjectModified(_) => ActionKind::ObjectModified,
            Self::ObjectRemoved { .. } => ActionKind::ObjectRemoved,
            Self::EnvironmentUpdated(_) => ActionKind::EnvironmentUpdated,
            Self::TerrainCreated(_) => ActionKind::TerrainCreated,
            Self::Narration { .. } => ActionKind::Narration,
            Self::ModelUploaded(_) => ActionKind::ModelUploaded,
            Self::Error(_) => ActionKind::Error,
        }
    }

    /// Check if this action reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Name of the object this action concerns, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::ObjectCreated(obj) | Self::ObjectModified(obj) => Some(&obj.name),
            Self::ObjectRemoved { name } => Some(name),
            Self::ModelUploaded(model) => Some(&model.object_name),
            Self::Error(err) => err.name.as_deref(),
            _ => None,
        }
    }

    /// Tool-result text fed back to the agent
    pub fn feedback(&self) -> String {
        match self {
            Self::Error(err) => format!("Error: {}", err.message),
            Self::ModelUploaded(model) => format!(
                "Success: {} - {} ({})",
                self.kind(),
                model.object_name,
                model.url
            ),
            other => format!("Success: {} - {}", other.kind(), other.subject().unwrap_or("")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_reports_adjusted_name() {
        let action = Action::ObjectCreated(WorldObject::new("tree_1a2b3c"));
        assert_eq!(action.feedback(), "Success: object_created - tree_1a2b3c");
        assert!(!action.is_error());
    }

    #[test]
    fn test_feedback_for_errors() {
        let action = Action::error("Unknown tool: fly");
        assert!(action.is_error());
        assert_eq!(action.kind(), ActionKind::Error);
        assert_eq!(action.feedback(), "Error: Unknown tool: fly");
    }

    #[test]
    fn test_narration_has_no_subject() {
        let action = Action::Narration { text: "Dusk settles.".into() };
        assert_eq!(action.subject(), None);
        assert_eq!(action.feedback(), "Success: narration - ");
    }
}
