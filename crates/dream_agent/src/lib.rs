//! # Dream Agent
//!
//! Turns one user utterance into an ordered list of world [`Action`]s.
//!
//! - [`tools`]: the closed tool catalogue the agent is offered
//! - [`dispatcher`]: maps one tool call onto exactly one world operation
//! - [`orchestrator`]: the bounded ask → execute → feed back loop
//! - [`provider`]: chat-completion endpoint boundary
//! - [`mesh`]: mesh-generation collaborator boundary
//!
//! ## Usage
//!
//! ```ignore
//! let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(llm_config)?);
//! let mut agent = AgentOrchestrator::new(provider, Pricing::default());
//!
//! let mut world = WorldEngine::new();
//! world.increment_turn();
//! let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);
//! let actions = agent.run_turn("a quiet forest at dusk", &mut dispatcher).await;
//! ```

pub mod action;
pub mod cost;
pub mod dispatcher;
pub mod history;
pub mod mesh;
pub mod orchestrator;
pub mod provider;
pub mod tools;

pub use action::{Action, ActionError, ActionKind, ModelPlacement};
pub use cost::{CostSummary, CostTracker, Pricing};
pub use dispatcher::{ToolDispatcher, ToolError, ToolExecutor};
pub use history::{
    ConversationEntry, ConversationHistory, ToolInvocation, HISTORY_KEEP, HISTORY_LIMIT,
};
pub use mesh::{
    DisabledMeshGenerator, GeneratedFile, MeshError, MeshGenerator, MeshOutput,
    ProcessMeshGenerator,
};
pub use orchestrator::{frame_user_message, AgentOrchestrator, MAX_CONTINUATIONS};
pub use provider::{
    ChatProvider, ChatRequest, ChatResponse, LlmConfig, OpenAiProvider, ProviderError, Usage,
};
pub use tools::{catalogue, ModelRequest, ToolCall, ToolKind, SYSTEM_PROMPT};
