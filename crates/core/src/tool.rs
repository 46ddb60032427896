//! Tool trait — the abstraction over agent capabilities.
//!
//! One invocable shape covers both locally-defined tools and tools
//! discovered from MCP servers: a stable name, a JSON-schema parameter
//! contract, and an invocation taking the model's raw JSON argument string.
//!
//! Runtime tool failures are never fatal to a run. `failure_message` maps
//! an invocation error to LLM-visible text that is fed back into the
//! conversation so the model can retry or recover.

use crate::agent::Agent;
use crate::error::ToolError;
use crate::input::Input;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A tool definition sent to the model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,

    /// Whether `parameters` conforms to the strict-schema subset.
    #[serde(default)]
    pub strict: bool,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool within an agent's resolved tool set.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Whether the parameter schema is in strict mode.
    fn strict_schema(&self) -> bool {
        false
    }

    /// Whether this tool is currently available to the given agent.
    /// Checked per invocation; a disabled tool invoked anyway fails with
    /// [`ToolError::Disabled`].
    async fn is_enabled(&self, agent: &Agent) -> std::result::Result<bool, ToolError> {
        let _ = agent;
        Ok(true)
    }

    /// Execute the tool with the model's raw JSON argument string.
    async fn invoke(&self, arguments: &str) -> std::result::Result<serde_json::Value, ToolError>;

    /// Map an invocation error to the message shown to the model.
    fn failure_message(&self, error: &ToolError) -> String {
        default_tool_error_message(error)
    }

    /// Convert this tool into a definition for sending to the backend.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            strict: self.strict_schema(),
        }
    }
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Tool {}>", self.name())
    }
}

/// The error text sent to the model when a tool has no custom mapper.
pub fn default_tool_error_message(error: &ToolError) -> String {
    format!("An error occurred while running the tool. Please try again. Error: {error}")
}

/// Find a tool by name in a resolved tool set.
pub fn find_tool<'a>(tools: &'a [Arc<dyn Tool>], name: &str) -> Option<&'a Arc<dyn Tool>> {
    tools.iter().find(|t| t.name() == name)
}

/// Selects relevant tools based on the run input.
///
/// Consulted by the runner when the resolved tool count exceeds the routing
/// threshold; a routing failure falls back to the unfiltered set.
#[async_trait]
pub trait ToolRouter: Send + Sync {
    async fn route(
        &self,
        input: &Input,
        tools: Vec<Arc<dyn Tool>>,
    ) -> std::result::Result<Vec<Arc<dyn Tool>>, ToolError>;
}

type InvokeFn =
    dyn Fn(&str) -> std::result::Result<serde_json::Value, ToolError> + Send + Sync;
type EnabledFn = dyn Fn(&Agent) -> bool + Send + Sync;
type FailureFn = dyn Fn(&ToolError) -> String + Send + Sync;

/// A tool backed by a plain function.
///
/// Covers synchronous tools declared inline; IO-bound tools implement
/// [`Tool`] directly.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters_schema: serde_json::Value,
    strict: bool,
    invoke: Arc<InvokeFn>,
    enabled: Option<Arc<EnabledFn>>,
    failure: Option<Arc<FailureFn>>,
}

impl FunctionTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: serde_json::Value,
        invoke: F,
    ) -> Self
    where
        F: Fn(&str) -> std::result::Result<serde_json::Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
            strict: false,
            invoke: Arc::new(invoke),
            enabled: None,
            failure: None,
        }
    }

    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Gate this tool on a per-agent enablement check.
    pub fn with_enabled<F>(mut self, enabled: F) -> Self
    where
        F: Fn(&Agent) -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(enabled));
        self
    }

    /// Override the LLM-visible message produced from invocation errors.
    pub fn with_failure_message<F>(mut self, failure: F) -> Self
    where
        F: Fn(&ToolError) -> String + Send + Sync + 'static,
    {
        self.failure = Some(Arc::new(failure));
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.parameters_schema.clone()
    }

    fn strict_schema(&self) -> bool {
        self.strict
    }

    async fn is_enabled(&self, agent: &Agent) -> std::result::Result<bool, ToolError> {
        match &self.enabled {
            Some(check) => Ok(check(agent)),
            None => Ok(true),
        }
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<serde_json::Value, ToolError> {
        (self.invoke)(arguments)
    }

    fn failure_message(&self, error: &ToolError) -> String {
        match &self.failure {
            Some(mapper) => mapper(error),
            None => default_tool_error_message(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool() -> FunctionTool {
        FunctionTool::new(
            "echo",
            "Echoes back the input",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            }),
            |arguments| {
                let args: serde_json::Value = serde_json::from_str(arguments)
                    .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
                Ok(args["text"].clone())
            },
        )
    }

    #[tokio::test]
    async fn invoke_parses_raw_arguments() {
        let tool = echo_tool();
        let result = tool.invoke(r#"{"text":"hello world"}"#).await.unwrap();
        assert_eq!(result, "hello world");
    }

    #[tokio::test]
    async fn invalid_arguments_surface_as_tool_error() {
        let tool = echo_tool();
        let err = tool.invoke("not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn definition_carries_schema_and_strict_flag() {
        let tool = echo_tool().with_strict_schema(true);
        let def = tool.definition();
        assert_eq!(def.name, "echo");
        assert!(def.strict);
        assert_eq!(def.parameters["required"][0], "text");
    }

    #[tokio::test]
    async fn enablement_check_sees_the_agent() {
        let tool = echo_tool().with_enabled(|agent: &Agent| agent.name == "allowed");
        assert!(tool.is_enabled(&Agent::new("allowed")).await.unwrap());
        assert!(!tool.is_enabled(&Agent::new("other")).await.unwrap());
    }

    #[test]
    fn custom_failure_message_wins() {
        let tool = echo_tool()
            .with_failure_message(|e| format!("echo had a bad day: {e}"));
        let message = tool.failure_message(&ToolError::ExecutionFailed {
            tool_name: "echo".into(),
            reason: "broken".into(),
        });
        assert!(message.starts_with("echo had a bad day"));
    }

    #[test]
    fn default_failure_message_mentions_retry() {
        let tool = echo_tool();
        let message = tool.failure_message(&ToolError::Disabled("echo".into()));
        assert!(message.contains("Please try again"));
        assert!(message.contains("disabled"));
    }

    #[test]
    fn find_tool_by_name() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(echo_tool())];
        assert!(find_tool(&tools, "echo").is_some());
        assert!(find_tool(&tools, "missing").is_none());
    }
}
