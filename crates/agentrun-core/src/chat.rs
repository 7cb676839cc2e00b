//! Chat-style progress entries.
//!
//! Progress entries are opaque JSON to the core. Runners that produce a
//! conversation use this shape: `{"role": "...", "content": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// User message (the submitted task).
    User,
    /// Assistant message (agent step output).
    Assistant,
    /// System message.
    System,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of this message.
    pub role: ChatRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Convert into an opaque progress entry.
    pub fn into_entry(self) -> Value {
        serde_json::json!({
            "role": self.role,
            "content": self.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_entry() {
        let entry = ChatMessage::assistant("Step 1").into_entry();
        assert_eq!(entry["role"], "assistant");
        assert_eq!(entry["content"], "Step 1");
    }
}
