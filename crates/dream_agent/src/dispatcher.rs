//! Tool dispatcher
//!
//! Maps one tool call onto exactly one world operation. Nothing here can
//! fail the turn: every failure comes back as an [`Action::Error`].

use async_trait::async_trait;
use dream_world::{Vector3, WorldEngine};
use serde_json::Value;
use thiserror::Error;

use crate::action::{Action, ActionError, ModelPlacement};
use crate::mesh::MeshGenerator;
use crate::tools::{ModelRequest, ToolCall};

/// Tool-level failures; always converted into an error action
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Object not found: {0}")]
    TargetNotFound(String),

    #[error("Model generation failed: {0}")]
    Generation(String),
}

impl From<ToolError> for Action {
    fn from(err: ToolError) -> Self {
        let name = match &err {
            ToolError::TargetNotFound(name) => Some(name.clone()),
            _ => None,
        };
        Action::Error(ActionError {
            message: err.to_string(),
            name,
            success: None,
        })
    }
}

/// Executes tool calls on behalf of the orchestrator
#[async_trait]
pub trait ToolExecutor: Send {
    /// Digest of the world the tools act on
    fn context_summary(&self) -> String;

    /// Execute one named call
    async fn execute(&mut self, name: &str, arguments: &Value) -> Action;
}

/// Executes tool calls against one world
pub struct ToolDispatcher<'a> {
    world: &'a mut WorldEngine,
    mesh: &'a dyn MeshGenerator,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(world: &'a mut WorldEngine, mesh: &'a dyn MeshGenerator) -> Self {
        Self { world, mesh }
    }

    /// Apply a decoded call
    pub async fn dispatch(&mut self, call: ToolCall) -> Action {
        match call {
            ToolCall::CreateObject(spec) => Action::ObjectCreated(self.world.create_object(spec)),
            ToolCall::ModifyObject(patch) => match self.world.modify_object(&patch) {
                Some(object) => Action::ObjectModified(object),
                None => ToolError::TargetNotFound(patch.name).into(),
            },
            ToolCall::RemoveObject { name } => {
                if self.world.remove_object(&name) {
                    Action::ObjectRemoved { name }
                } else {
                    Action::Error(ActionError {
                        message: ToolError::TargetNotFound(name.clone()).to_string(),
                        name: Some(name),
                        success: Some(false),
                    })
                }
            }
            ToolCall::SetEnvironment(patch) => {
                Action::EnvironmentUpdated(self.world.update_environment(&patch))
            }
            ToolCall::CreateTerrain(spec) => Action::TerrainCreated(self.world.add_terrain(&spec)),
            ToolCall::Narrate { text } => {
                self.world.add_narrative(text.clone());
                Action::Narration { text }
            }
            ToolCall::Generate3dModel(request) => match self.generate(request).await {
                Ok(placement) => Action::ModelUploaded(placement),
                Err(err) => err.into(),
            },
        }
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelPlacement, ToolError> {
        let output = self
            .mesh
            .generate(&request.code)
            .await
            .map_err(|err| ToolError::Generation(err.to_string()))?;

        if !output.is_usable() {
            let reason = output
                .error
                .clone()
                .unwrap_or_else(|| "no model files were produced".to_string());
            return Err(ToolError::Generation(reason));
        }

        let primary = output.files[0].clone();
        Ok(ModelPlacement {
            object_name: request.object_name,
            url: primary.url,
            filename: primary.filename,
            files: output.files,
            position: resolve(request.position, Vector3::ZERO),
            rotation: resolve(request.rotation, Vector3::ZERO),
            scale: resolve(request.scale, Vector3::ONE),
        })
    }
}

fn resolve(spec: Option<dream_world::Vec3Spec>, base: Vector3) -> Vector3 {
    spec.map_or(base, |v| v.resolve(base))
}

#[async_trait]
impl ToolExecutor for ToolDispatcher<'_> {
    fn context_summary(&self) -> String {
        self.world.context_summary()
    }

    async fn execute(&mut self, name: &str, arguments: &Value) -> Action {
        log::debug!("Dispatching tool call: {}", name);
        let action = match ToolCall::parse(name, arguments) {
            Ok(call) => self.dispatch(call).await,
            Err(err) => err.into(),
        };
        if let Action::Error(err) = &action {
            log::warn!("Tool call {} failed: {}", name, err.message);
        }
        action
    }
}
