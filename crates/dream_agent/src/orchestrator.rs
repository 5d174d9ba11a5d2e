//! Agent orchestrator
//!
//! Drives one user utterance through the provider/tool loop:
//!
//! 1. Compose: system prompt, bounded history, world summary, tool catalogue
//! 2. Invoke the provider once and record its token usage
//! 3. Execute every returned tool call in order, feeding each result back
//! 4. Go again while the provider has calls pending or a call failed,
//!    at most [`MAX_CONTINUATIONS`] times
//!
//! The loop is iterative; the round counter is the only bound on a
//! misbehaving agent.

use std::sync::Arc;

use crate::action::Action;
use crate::cost::{CostSummary, CostTracker, Pricing};
use crate::dispatcher::ToolExecutor;
use crate::history::{ConversationEntry, ConversationHistory};
use crate::provider::{ChatProvider, ChatRequest};
use crate::tools::{self, SYSTEM_PROMPT};

/// Continuation rounds allowed after the first, per user input
pub const MAX_CONTINUATIONS: usize = 5;

/// Frame the raw user text with the current world digest
pub fn frame_user_message(context: &str, text: &str) -> String {
    format!("[Current World State]\n{}\n\n[User says]: {}", context, text)
}

/// Per-session agent: conversation history plus cost accounting
pub struct AgentOrchestrator {
    provider: Arc<dyn ChatProvider>,
    history: ConversationHistory,
    cost: CostTracker,
    max_continuations: usize,
}

impl AgentOrchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>, pricing: Pricing) -> Self {
        Self {
            provider,
            history: ConversationHistory::new(),
            cost: CostTracker::new(pricing),
            max_continuations: MAX_CONTINUATIONS,
        }
    }

    /// Override the continuation cap
    pub fn with_max_continuations(mut self, max: usize) -> Self {
        self.max_continuations = max;
        self
    }

    /// Run one turn and return every action it produced, in order
    pub async fn run_turn(&mut self, text: &str, tools: &mut dyn ToolExecutor) -> Vec<Action> {
        let context = tools.context_summary();
        self.history.push(ConversationEntry::User {
            content: frame_user_message(&context, text),
        });

        let mut actions = Vec::new();
        let mut round = 0;

        loop {
            let request = ChatRequest {
                system: SYSTEM_PROMPT,
                messages: self.history.wire_entries(),
                tools: tools::catalogue(),
            };

            let response = match self.provider.complete(&request).await {
                Ok(response) => response,
                Err(err) => {
                    log::error!("Chat provider error in round {}: {}", round, err);
                    actions.push(Action::error(format!("AI service error: {}", err)));
                    break;
                }
            };

            self.cost.record(response.usage);
            self.history.push(ConversationEntry::Assistant {
                content: response.text.clone(),
                tool_calls: response.tool_calls.clone(),
            });

            let mut had_error = false;
            for call in &response.tool_calls {
                let action = tools.execute(&call.name, &call.arguments).await;
                had_error |= action.is_error();
                self.history.push(ConversationEntry::Tool {
                    tool_call_id: call.id.clone(),
                    content: action.feedback(),
                });
                actions.push(action);
            }

            let pending = response.more_pending && !response.tool_calls.is_empty();
            if !(pending || had_error) {
                break;
            }
            if round >= self.max_continuations {
                log::warn!(
                    "Stopping after {} continuations with work still pending",
                    self.max_continuations
                );
                break;
            }
            round += 1;
        }

        log::info!("Turn produced {} actions in {} rounds", actions.len(), round + 1);
        actions
    }

    /// Forget the conversation; cost totals are kept
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn cost_summary(&self) -> CostSummary {
        self.cost.summary()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_framing() {
        assert_eq!(
            frame_user_message("Turn: 1", "a castle"),
            "[Current World State]\nTurn: 1\n\n[User says]: a castle"
        );
    }
}
