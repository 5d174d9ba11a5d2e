//! Bounded conversation history

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// History length that triggers trimming
pub const HISTORY_LIMIT: usize = 20;

/// Entries kept after trimming
pub const HISTORY_KEEP: usize = 16;

/// A tool invocation requested by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned call id, echoed back on the result entry
    pub id: String,
    pub name: String,
    /// Decoded argument object
    pub arguments: Value,
}

/// One message in the agent conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationEntry {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// Append-only history, trimmed from the front
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<ConversationEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; once the length exceeds [`HISTORY_LIMIT`] only the
    /// most recent [`HISTORY_KEEP`] entries survive
    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
        if self.entries.len() > HISTORY_LIMIT {
            let excess = self.entries.len() - HISTORY_KEEP;
            self.entries.drain(..excess);
            log::debug!("Trimmed {} history entries", excess);
        }
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Entries safe to send: tool results whose assistant entry was trimmed
    /// away are skipped
    pub fn wire_entries(&self) -> &[ConversationEntry] {
        let start = self
            .entries
            .iter()
            .position(|e| !matches!(e, ConversationEntry::Tool { .. }))
            .unwrap_or(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
