//! Error types for the Windlass domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; terminal run outcomes
//! (`Tripwire`, `MaxTurnsExceeded`) are first-class so callers can branch
//! on them programmatically.

use thiserror::Error;

/// The top-level error type for all Windlass operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Session storage errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Tool errors (fatal setup failures; runtime tool failures are
    // recovered into conversation content and never surface here) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- MCP server errors ---
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    // --- Guardrail execution failures (not tripwires) ---
    #[error("Guardrail error: {0}")]
    Guardrail(#[from] GuardrailError),

    // --- A guardrail tripwire fired; expected control flow, not a fault ---
    #[error(transparent)]
    Tripwire(#[from] TripwireError),

    // --- Turn budget exhausted without a final output ---
    #[error("max turns exceeded: reached limit of {max_turns} turns")]
    MaxTurnsExceeded { max_turns: u64 },

    // --- The model produced output the agent's output type rejects ---
    #[error("Model behavior error: {0}")]
    ModelBehavior(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// A guardrail signalled that execution must halt.
///
/// Carries the guardrail's name, its opaque info payload, and whether it was
/// an input or an output guardrail.
#[derive(Debug, Clone)]
pub struct TripwireError {
    pub guardrail: String,
    pub info: Option<serde_json::Value>,
    pub is_input: bool,
}

impl std::fmt::Display for TripwireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_input {
            write!(f, "input guardrail '{}' triggered", self.guardrail)
        } else {
            write!(f, "output guardrail '{}' triggered", self.guardrail)
        }
    }
}

impl std::error::Error for TripwireError {}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Call shape not supported: {0}")]
    NotSupported(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session ID is required")]
    InvalidSessionId,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Invalid item data: {0}")]
    InvalidItemData(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    #[error("Tool {0} is disabled")]
    Disabled(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool schema: {0}")]
    Schema(String),

    #[error("Tool routing failed: {0}")]
    RoutingFailed(String),
}

#[derive(Debug, Error)]
pub enum McpError {
    #[error("server not initialized: make sure you call `connect()` first")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool call failed: {tool}: {reason}")]
    CallFailed { tool: String, reason: String },
}

#[derive(Debug, Error)]
pub enum GuardrailError {
    #[error("guardrail '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_turns_error_displays_limit() {
        let err = Error::MaxTurnsExceeded { max_turns: 10 };
        assert_eq!(
            err.to_string(),
            "max turns exceeded: reached limit of 10 turns"
        );
    }

    #[test]
    fn input_tripwire_display() {
        let err = TripwireError {
            guardrail: "content_filter".into(),
            info: None,
            is_input: true,
        };
        assert_eq!(err.to_string(), "input guardrail 'content_filter' triggered");
    }

    #[test]
    fn output_tripwire_display() {
        let err = TripwireError {
            guardrail: "safety_check".into(),
            info: Some(serde_json::json!({"score": 0.9})),
            is_input: false,
        };
        assert_eq!(err.to_string(), "output guardrail 'safety_check' triggered");
    }

    #[test]
    fn tripwire_wraps_transparently() {
        let err: Error = TripwireError {
            guardrail: "g".into(),
            info: None,
            is_input: true,
        }
        .into();
        assert!(matches!(err, Error::Tripwire(_)));
        assert_eq!(err.to_string(), "input guardrail 'g' triggered");
    }

    #[test]
    fn tool_error_displays_name() {
        let err = Error::Tool(ToolError::DuplicateName("get_weather".into()));
        assert!(err.to_string().contains("get_weather"));
    }
}
