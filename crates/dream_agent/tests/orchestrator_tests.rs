//! Integration tests for the agent loop
//!
//! A scripted provider stands in for the chat endpoint; tool calls run
//! against a real world engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dream_agent::*;
use dream_world::WorldEngine;
use serde_json::{json, Value};

/// Replays canned responses, then answers with plain text
#[derive(Default)]
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    calls: AtomicUsize,
    last_user_message: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<ChatResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let last_user = request.messages.iter().rev().find_map(|entry| match entry {
            ConversationEntry::User { content } => Some(content.clone()),
            _ => None,
        });
        *self.last_user_message.lock().unwrap() = last_user;

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("Done.")))
    }
}

/// Provider that always asks for one more tool call
struct LoopingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatProvider for LoopingProvider {
    async fn complete(&self, _request: &ChatRequest<'_>) -> Result<ChatResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(tool_response(vec![call(&format!("c{}", n), "narrate", json!({ "text": "again" }))], true))
    }
}

/// Executor whose every call fails
struct FailingExecutor {
    executed: usize,
}

#[async_trait]
impl ToolExecutor for FailingExecutor {
    fn context_summary(&self) -> String {
        "Turn: 1".to_string()
    }

    async fn execute(&mut self, name: &str, _arguments: &Value) -> Action {
        self.executed += 1;
        Action::error(format!("Unknown tool: {}", name))
    }
}

fn call(id: &str, name: &str, arguments: Value) -> ToolInvocation {
    ToolInvocation {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn tool_response(calls: Vec<ToolInvocation>, more_pending: bool) -> ChatResponse {
    ChatResponse {
        text: None,
        tool_calls: calls,
        more_pending,
        usage: Usage { input_tokens: 100, output_tokens: 20 },
    }
}

fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        text: Some(text.to_string()),
        tool_calls: Vec::new(),
        more_pending: false,
        usage: Usage { input_tokens: 50, output_tokens: 5 },
    }
}

async fn run(provider: Arc<ScriptedProvider>, world: &mut WorldEngine, text: &str) -> Vec<Action> {
    let mut agent = AgentOrchestrator::new(provider, Pricing::default());
    world.increment_turn();
    let mut dispatcher = ToolDispatcher::new(world, &DisabledMeshGenerator);
    agent.run_turn(text, &mut dispatcher).await
}

#[tokio::test]
async fn test_always_erroring_rounds_are_capped() {
    let provider = ScriptedProvider::new(
        (0..20)
            .map(|i| Ok(tool_response(vec![call(&format!("c{}", i), "bogus", json!({}))], false)))
            .collect(),
    );
    let mut agent = AgentOrchestrator::new(provider.clone(), Pricing::default());
    let mut executor = FailingExecutor { executed: 0 };

    let actions = agent.run_turn("build", &mut executor).await;

    assert_eq!(provider.calls(), MAX_CONTINUATIONS + 1);
    assert_eq!(executor.executed, MAX_CONTINUATIONS + 1);
    assert_eq!(actions.len(), MAX_CONTINUATIONS + 1);
    assert!(actions.iter().all(Action::is_error));
}

#[tokio::test]
async fn test_pending_rounds_are_capped() {
    let provider = Arc::new(LoopingProvider { calls: AtomicUsize::new(0) });
    let mut agent = AgentOrchestrator::new(provider.clone(), Pricing::default());
    let mut world = WorldEngine::new();
    let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);

    let actions = agent.run_turn("keep going", &mut dispatcher).await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 6);
    assert_eq!(actions.len(), 6);
    assert_eq!(agent.cost_summary().total_requests, 6);
}

#[tokio::test]
async fn test_custom_cap() {
    let provider = Arc::new(LoopingProvider { calls: AtomicUsize::new(0) });
    let mut agent =
        AgentOrchestrator::new(provider.clone(), Pricing::default()).with_max_continuations(0);
    let mut world = WorldEngine::new();
    let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);

    agent.run_turn("once", &mut dispatcher).await;
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tree_twice_gets_unique_names() {
    let provider = ScriptedProvider::new(vec![Ok(tool_response(
        vec![
            call("c1", "create_object", json!({ "name": "tree", "geometry": { "type": "cylinder" } })),
            call("c2", "create_object", json!({ "name": "tree", "geometry": { "type": "sphere" } })),
        ],
        false,
    ))]);
    let mut world = WorldEngine::new();

    let actions = run(provider.clone(), &mut world, "two trees").await;

    assert_eq!(actions.len(), 2);
    let names: Vec<&str> = actions.iter().filter_map(Action::subject).collect();
    assert_eq!(names[0], "tree");
    assert!(names[1].starts_with("tree_"));
    assert_ne!(names[1], "tree");
    assert_eq!(world.object_count(), 2);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_remove_ghost_feeds_error_back() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![call("c1", "remove_object", json!({ "name": "ghost" }))], false)),
        Ok(text_response("Nothing to remove.")),
    ]);
    let mut world = WorldEngine::new();

    let actions = run(provider.clone(), &mut world, "remove the ghost").await;

    assert_eq!(actions.len(), 1);
    match &actions[0] {
        Action::Error(err) => {
            assert!(err.message.contains("ghost"));
            assert_eq!(err.name.as_deref(), Some("ghost"));
            assert_eq!(err.success, Some(false));
        }
        other => panic!("expected error action, got {:?}", other),
    }
    // The error triggered exactly one corrective round
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_night_reaches_summary() {
    let provider = ScriptedProvider::new(vec![Ok(tool_response(
        vec![call(
            "c1",
            "set_environment",
            json!({ "time_of_day": "night", "sun_intensity": 0.1 }),
        )],
        false,
    ))]);
    let mut world = WorldEngine::new();

    let actions = run(provider, &mut world, "make it night").await;

    assert_eq!(actions[0].kind(), ActionKind::EnvironmentUpdated);
    assert!(world.context_summary().contains("night"));
}

#[tokio::test]
async fn test_pending_calls_continue_in_order() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(
            vec![call("c1", "create_terrain", json!({ "type": "hills" }))],
            true,
        )),
        Ok(tool_response(
            vec![
                call("c2", "create_object", json!({ "name": "oak", "geometry": { "type": "cylinder" } })),
                call("c3", "narrate", json!({ "text": "An oak on a hill." })),
            ],
            false,
        )),
    ]);
    let mut world = WorldEngine::new();

    let actions = run(provider.clone(), &mut world, "an oak on a hill").await;

    let kinds: Vec<ActionKind> = actions.iter().map(Action::kind).collect();
    assert_eq!(
        kinds,
        vec![ActionKind::TerrainCreated, ActionKind::ObjectCreated, ActionKind::Narration]
    );
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_provider_failure_ends_turn() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(
            vec![call("c1", "narrate", json!({ "text": "Rain." }))],
            true,
        )),
        Err(ProviderError::Status { code: 429, body: "rate limited".to_string() }),
    ]);
    let mut agent = AgentOrchestrator::new(provider.clone(), Pricing::default());
    let mut world = WorldEngine::new();
    let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);

    let actions = agent.run_turn("rain", &mut dispatcher).await;

    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind(), ActionKind::Narration);
    match &actions[1] {
        Action::Error(err) => assert!(err.message.starts_with("AI service error:")),
        other => panic!("expected error action, got {:?}", other),
    }
    assert_eq!(provider.calls(), 2);
    // user, assistant, tool result; nothing from the failed round
    assert_eq!(agent.history().len(), 3);
    assert_eq!(agent.cost_summary().total_requests, 1);
}

#[tokio::test]
async fn test_context_summary_grounds_each_turn() {
    let provider = ScriptedProvider::new(vec![Ok(tool_response(
        vec![call("c1", "create_object", json!({ "name": "barn", "geometry": { "type": "box" } }))],
        false,
    ))]);
    let mut agent = AgentOrchestrator::new(provider.clone(), Pricing::default());
    let mut world = WorldEngine::new();

    for text in ["a red barn", "now a fence"] {
        world.increment_turn();
        let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);
        agent.run_turn(text, &mut dispatcher).await;
    }

    let sent = provider.last_user_message.lock().unwrap().clone().unwrap();
    assert!(sent.starts_with("[Current World State]\nTurn: 2"));
    assert!(sent.contains("  - barn: box at (0.0, 0.0, 0.0)"));
    assert!(sent.ends_with("[User says]: now a fence"));
}

#[tokio::test]
async fn test_reset_keeps_cost() {
    let provider = ScriptedProvider::new(Vec::new());
    let mut agent = AgentOrchestrator::new(provider, Pricing::default());
    let mut world = WorldEngine::new();
    let mut dispatcher = ToolDispatcher::new(&mut world, &DisabledMeshGenerator);

    agent.run_turn("hello", &mut dispatcher).await;
    assert_eq!(agent.history().len(), 2);

    agent.reset();
    assert!(agent.history().is_empty());
    let cost = agent.cost_summary();
    assert_eq!(cost.total_requests, 1);
    assert_eq!(cost.total_input_tokens, 50);
}
