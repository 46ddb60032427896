//! The MCP server contract — the four operations the runtime depends on.
//!
//! Transport and session plumbing live in `windlass-mcp`; the core only
//! needs to connect, list tools (optionally filtered per agent), call a
//! tool, and clean up, plus a flag saying whether structured-content
//! results should be preferred over raw content when serializing.

use crate::agent::Agent;
use crate::error::McpError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool as advertised by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// The tool's input schema, if the server declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// The result of calling an MCP tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Raw content elements, in server order.
    #[serde(default)]
    pub content: Vec<serde_json::Value>,

    /// Structured output, when the server produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,

    /// Whether the server reported the call as failed.
    #[serde(default)]
    pub is_error: bool,
}

/// Context handed to tool filters.
pub struct McpFilterContext<'a> {
    pub agent: &'a Agent,
    pub server_name: &'a str,
}

/// Decides which MCP tools an agent may see.
pub trait McpToolFilter: Send + Sync {
    fn allow(
        &self,
        ctx: &McpFilterContext<'_>,
        tool: &McpToolInfo,
    ) -> std::result::Result<bool, McpError>;
}

/// Filters tools by allow/block name lists. An empty allow list admits
/// everything not blocked.
#[derive(Debug, Clone, Default)]
pub struct StaticToolFilter {
    pub allowed_tool_names: Vec<String>,
    pub blocked_tool_names: Vec<String>,
}

impl StaticToolFilter {
    pub fn new(allowed: Vec<String>, blocked: Vec<String>) -> Self {
        Self {
            allowed_tool_names: allowed,
            blocked_tool_names: blocked,
        }
    }
}

impl McpToolFilter for StaticToolFilter {
    fn allow(
        &self,
        _ctx: &McpFilterContext<'_>,
        tool: &McpToolInfo,
    ) -> std::result::Result<bool, McpError> {
        if !self.allowed_tool_names.is_empty()
            && !self.allowed_tool_names.iter().any(|n| n == &tool.name)
        {
            return Ok(false);
        }
        if self.blocked_tool_names.iter().any(|n| n == &tool.name) {
            return Ok(false);
        }
        Ok(true)
    }
}

/// The Model Context Protocol server contract.
///
/// Implementations must call `connect` before use and `cleanup` when done.
#[async_trait]
pub trait McpServer: Send + Sync {
    /// A human-readable name identifying this server.
    fn name(&self) -> &str;

    /// Prefer `structured_content` over raw content when serializing tool
    /// results for the model.
    fn use_structured_content(&self) -> bool {
        false
    }

    async fn connect(&self) -> std::result::Result<(), McpError>;

    async fn cleanup(&self) -> std::result::Result<(), McpError>;

    /// List the tools this server exposes to the given agent.
    async fn list_tools(&self, agent: &Agent) -> std::result::Result<Vec<McpToolInfo>, McpError>;

    /// Invoke a tool by name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> std::result::Result<McpToolResult, McpError>;
}

impl std::fmt::Debug for dyn McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<McpServer {}>", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> McpToolInfo {
        McpToolInfo {
            name: name.into(),
            description: String::new(),
            input_schema: None,
        }
    }

    fn ctx_agent() -> Agent {
        Agent::new("test")
    }

    #[test]
    fn empty_filter_admits_everything() {
        let filter = StaticToolFilter::default();
        let agent = ctx_agent();
        let ctx = McpFilterContext {
            agent: &agent,
            server_name: "srv",
        };
        assert!(filter.allow(&ctx, &tool("anything")).unwrap());
    }

    #[test]
    fn allow_list_is_exclusive() {
        let filter = StaticToolFilter::new(vec!["search".into()], vec![]);
        let agent = ctx_agent();
        let ctx = McpFilterContext {
            agent: &agent,
            server_name: "srv",
        };
        assert!(filter.allow(&ctx, &tool("search")).unwrap());
        assert!(!filter.allow(&ctx, &tool("delete")).unwrap());
    }

    #[test]
    fn block_list_beats_allow_list() {
        let filter = StaticToolFilter::new(
            vec!["search".into(), "delete".into()],
            vec!["delete".into()],
        );
        let agent = ctx_agent();
        let ctx = McpFilterContext {
            agent: &agent,
            server_name: "srv",
        };
        assert!(!filter.allow(&ctx, &tool("delete")).unwrap());
    }

    #[test]
    fn tool_result_defaults_are_empty() {
        let result = McpToolResult::default();
        assert!(result.content.is_empty());
        assert!(result.structured_content.is_none());
        assert!(!result.is_error);
    }
}
