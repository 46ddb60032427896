//! Conversation items — the ordered, append-only units of history.
//!
//! Everything that flows between the caller, the model backend, the tools
//! and the session store is expressed as a `ConversationItem`. The set of
//! variants is closed: a message, a tool-call request, or a tool-call
//! result. Within a turn, every tool-call request is eventually followed by
//! exactly one matching result (paired by `call_id`).

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// One unit of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    /// A user/assistant/system message.
    Message { role: Role, content: String },

    /// A model-requested tool invocation. `arguments` is the raw JSON string
    /// exactly as the model produced it.
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },

    /// The result of a tool invocation, paired to its request by `call_id`.
    ToolResult { call_id: String, output: String },
}

impl ConversationItem {
    /// Create a user message item.
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message item.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message item.
    pub fn system(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a tool-call request item.
    pub fn tool_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Create a tool-result item.
    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            output: output.into(),
        }
    }

    /// The message content, if this item is a message.
    pub fn message_content(&self) -> Option<&str> {
        match self {
            Self::Message { content, .. } => Some(content),
            _ => None,
        }
    }

    /// The call identifier, if this item is a tool call or a tool result.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCall { call_id, .. } | Self::ToolResult { call_id, .. } => Some(call_id),
            Self::Message { .. } => None,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult { .. })
    }
}
