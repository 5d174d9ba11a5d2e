//! Chat-completion provider boundary
//!
//! [`ChatProvider`] is the orchestrator's only suspension point. The bundled
//! [`OpenAiProvider`] speaks the OpenAI-compatible `/chat/completions` API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::history::{ConversationEntry, ToolInvocation};

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Invalid provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No API key configured")]
    MissingApiKey,
}

/// Token counts for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One outbound request
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [ConversationEntry],
    /// Tool catalogue
    pub tools: &'a Value,
}

/// One provider response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Free text, if any
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
    /// The provider stopped because it wants its tool calls answered
    pub more_pending: bool,
    pub usage: Usage,
}

/// Chat-completion endpoint
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ProviderError>;
}

/// Model and sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub api_base: String,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            top_p: None,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey)?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(&self.config, request);
        log::debug!(
            "Sending chat request: model={}, messages={}",
            self.config.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body: text,
            });
        }

        let parsed = parse_response(&text)?;
        log::info!(
            "Chat response: {} tool calls, {} in / {} out tokens",
            parsed.tool_calls.len(),
            parsed.usage.input_tokens,
            parsed.usage.output_tokens
        );
        Ok(parsed)
    }
}

/// Build the `/chat/completions` request body
pub fn build_request_body(config: &LlmConfig, request: &ChatRequest<'_>) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(json!({ "role": "system", "content": request.system }));
    messages.extend(request.messages.iter().map(entry_to_wire));

    let mut body = json!({
        "model": config.model,
        "messages": messages,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
    });
    if request.tools.as_array().map_or(false, |tools| !tools.is_empty()) {
        body["tools"] = request.tools.clone();
        body["tool_choice"] = json!("auto");
    }
    if let Some(top_p) = config.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

fn entry_to_wire(entry: &ConversationEntry) -> Value {
    match entry {
        ConversationEntry::User { content } => json!({ "role": "user", "content": content }),
        ConversationEntry::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            json!({ "role": "assistant", "content": content.clone().unwrap_or_default() })
        }
        ConversationEntry::Assistant { content, tool_calls } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        ConversationEntry::Tool {
            tool_call_id,
            content,
        } => json!({ "role": "tool", "tool_call_id": tool_call_id, "content": content }),
    }
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Parse a `/chat/completions` response body
pub fn parse_response(body: &str) -> Result<ChatResponse, ProviderError> {
    let wire: WireResponse = serde_json::from_str(body)?;
    let choice = wire.choices.into_iter().next().ok_or_else(|| {
        ProviderError::Decode(serde::de::Error::custom("response has no choices"))
    })?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolInvocation {
            id: call.id,
            name: call.function.name,
            arguments: decode_arguments(call.function.arguments),
        })
        .collect();

    let usage = wire
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        text: choice.message.content.filter(|text| !text.is_empty()),
        tool_calls,
        more_pending: choice.finish_reason.as_deref() == Some("tool_calls"),
        usage,
    })
}

/// Arguments usually arrive JSON-encoded in a string. Strings that do not
/// decode are kept as-is and rejected later by the dispatcher.
fn decode_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(raw) if raw.trim().is_empty() => Value::Object(Default::default()),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "create_object",
                            "arguments": "{\"name\": \"tree\", \"geometry\": {\"type\": \"cylinder\"}}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150 }
        }"#;

        let response = parse_response(body).unwrap();
        assert!(response.more_pending);
        assert!(response.text.is_none());
        assert_eq!(response.usage, Usage { input_tokens: 120, output_tokens: 30 });
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "create_object");
        assert_eq!(response.tool_calls[0].arguments["geometry"]["type"], "cylinder");
    }

    #[test]
    fn test_parse_text_only() {
        let body = r#"{
            "choices": [{ "message": { "content": "A calm lake." }, "finish_reason": "stop" }]
        }"#;
        let response = parse_response(body).unwrap();
        assert!(!response.more_pending);
        assert_eq!(response.text.as_deref(), Some("A calm lake."));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.usage, Usage::default());
    }

    #[test]
    fn test_undecodable_arguments_kept_raw() {
        assert_eq!(decode_arguments(json!("{not json")), json!("{not json"));
        assert_eq!(decode_arguments(json!("")), json!({}));
        assert_eq!(decode_arguments(json!({ "a": 1 })), json!({ "a": 1 }));
    }

    #[test]
    fn test_parse_rejects_empty_choices() {
        let err = parse_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let history = vec![
            ConversationEntry::User { content: "hello".into() },
            ConversationEntry::Assistant {
                content: None,
                tool_calls: vec![ToolInvocation {
                    id: "call_1".into(),
                    name: "narrate".into(),
                    arguments: json!({ "text": "hi" }),
                }],
            },
            ConversationEntry::Tool {
                tool_call_id: "call_1".into(),
                content: "Success: narration - ".into(),
            },
            ConversationEntry::Assistant { content: None, tool_calls: Vec::new() },
        ];
        let tools = json!([{ "type": "function" }]);
        let request = ChatRequest { system: "be nice", messages: &history, tools: &tools };
        let config = LlmConfig { top_p: Some(0.9), ..Default::default() };

        let body = build_request_body(&config, &request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], r#"{"text":"hi"}"#);
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(messages[4]["content"], "");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["model"], "gpt-4o");
        assert!(body["top_p"].is_number());
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig { api_key: Some("  ".into()), ..Default::default() };
        assert!(matches!(OpenAiProvider::new(config), Err(ProviderError::MissingApiKey)));
    }
}
