//! Model backend contract — the abstraction over LLM services.
//!
//! A backend receives the merged request for one turn and returns ordered
//! output items. Two call shapes exist: `complete` (stateless chat style,
//! the default) and `respond` (stateful prompt style, selected when the
//! agent has a prompt source configured). The runner treats the backend as
//! an opaque request/response service; backend failures are fatal to a run.

use crate::error::BackendError;
use crate::item::ConversationItem;
use crate::prompt::Prompt;
use crate::settings::ModelSettings;
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The request for one model call.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    /// The model to use (e.g. "gpt-4o-mini").
    pub model: String,

    /// Resolved system instructions, if any.
    pub instructions: Option<String>,

    /// Conversation history plus (on the first turn) the caller's input.
    pub input: Vec<ConversationItem>,

    /// Tools the model may call.
    pub tools: Vec<ToolDefinition>,

    /// Merged tuning parameters.
    pub settings: ModelSettings,

    /// Resolved prompt reference. Required by `respond`, ignored by
    /// `complete`.
    pub prompt: Option<Prompt>,
}

/// One item of model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// An assistant message. The first message in a response is the
    /// candidate final output.
    Message { content: String },

    /// A request to invoke a tool.
    ToolCall {
        call_id: String,
        name: String,
        arguments: String,
    },
}

impl OutputItem {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

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

    /// Convert to the conversation-item form used for history writes.
    pub fn to_conversation_item(&self) -> ConversationItem {
        match self {
            OutputItem::Message { content } => ConversationItem::assistant(content.clone()),
            OutputItem::ToolCall {
                call_id,
                name,
                arguments,
            } => ConversationItem::tool_call(call_id.clone(), name.clone(), arguments.clone()),
        }
    }
}

/// Token usage for one or more model calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// Accumulate another usage record into this one.
    pub fn add(&mut self, other: &Usage) {
        self.requests += other.requests;
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A single model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Ordered output items (messages and tool-call requests).
    pub output: Vec<OutputItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

/// The model backend contract.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// The stateless chat call shape.
    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, BackendError>;

    /// The stateful prompt call shape. Backends without server-side prompt
    /// management keep the default.
    async fn respond(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, BackendError> {
        let _ = request;
        Err(BackendError::NotSupported(format!(
            "backend '{}' does not support the prompt call shape",
            self.name()
        )))
    }
}

impl std::fmt::Debug for dyn ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ModelBackend {}>", self.name())
    }
}
