//! Adapting MCP-discovered tools into the uniform [`Tool`] shape.
//!
//! A remote tool's schema is fetched once at resolution time and, when the
//! agent asks for it, normalized into the strict subset. Invocation
//! validates the model-supplied argument string, calls through to the
//! server, and serializes the result for the conversation.

use crate::strict::ensure_strict_json_schema;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use windlass_core::agent::Agent;
use windlass_core::error::{Error, Result, ToolError};
use windlass_core::mcp::{McpServer, McpToolInfo, McpToolResult};
use windlass_core::tool::Tool;

/// An MCP-discovered tool, invocable like any local tool.
pub struct McpFunctionTool {
    name: String,
    description: String,
    parameters_schema: Value,
    strict: bool,
    server: Arc<dyn McpServer>,
}

impl McpFunctionTool {
    /// Adapt one discovered tool. Strict conversion failures are setup
    /// errors for the caller configuring the agent.
    pub fn new(
        info: McpToolInfo,
        server: Arc<dyn McpServer>,
        strict: bool,
    ) -> std::result::Result<Self, ToolError> {
        let mut schema = match info.input_schema {
            Some(schema) if schema.is_object() => schema,
            Some(other) => {
                return Err(ToolError::Schema(format!(
                    "tool {} has a non-object input schema: {other}",
                    info.name
                )));
            }
            None => json!({}),
        };

        if let Value::Object(map) = &mut schema {
            if !map.is_empty() {
                map.entry("properties".to_string())
                    .or_insert_with(|| json!({}));
            }
        }

        if strict {
            schema = ensure_strict_json_schema(&schema)?;
        }

        Ok(Self {
            name: info.name,
            description: info.description,
            parameters_schema: schema,
            strict,
            server,
        })
    }
}

#[async_trait]
impl Tool for McpFunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters_schema.clone()
    }

    fn strict_schema(&self) -> bool {
        self.strict
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<Value, ToolError> {
        let args = if arguments.trim().is_empty() {
            None
        } else {
            let parsed: Value = serde_json::from_str(arguments).map_err(|e| {
                ToolError::InvalidArguments(format!("invalid input for {}: {e}", self.name))
            })?;
            if !parsed.is_object() {
                return Err(ToolError::InvalidArguments(format!(
                    "arguments for {} must be a JSON object",
                    self.name
                )));
            }
            Some(parsed)
        };

        let result = self
            .server
            .call_tool(&self.name, args)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            })?;

        serialize_result(self.server.as_ref(), &self.name, &result)
    }
}

/// Serialize an MCP tool result to the text the model sees.
///
/// Structured content wins when the server prefers it; otherwise the raw
/// content list collapses per element count (0 elements, one element, or
/// the whole list).
fn serialize_result(
    server: &dyn McpServer,
    tool_name: &str,
    result: &McpToolResult,
) -> std::result::Result<Value, ToolError> {
    let to_string = |value: &Value| {
        serde_json::to_string(value).map_err(|e| ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: format!("marshal result: {e}"),
        })
    };

    if server.use_structured_content() {
        if let Some(structured) = &result.structured_content {
            return Ok(Value::String(to_string(structured)?));
        }
    }

    match result.content.len() {
        0 => Ok(Value::String("[]".to_string())),
        1 => Ok(Value::String(to_string(&result.content[0])?)),
        _ => Ok(Value::String(to_string(&json!(result.content))?)),
    }
}

/// Fetch and adapt the tools of a single server.
pub async fn mcp_function_tools(
    server: &Arc<dyn McpServer>,
    agent: &Agent,
    strict: bool,
) -> Result<Vec<Arc<dyn Tool>>> {
    let infos = server.list_tools(agent).await.map_err(Error::Mcp)?;
    debug!(server = server.name(), count = infos.len(), "Listed MCP tools");

    let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(infos.len());
    for info in infos {
        let tool = McpFunctionTool::new(info, Arc::clone(server), strict)?;
        tools.push(Arc::new(tool));
    }
    Ok(tools)
}

/// Fetch and adapt the tools of every server, failing fast on a name
/// collision across servers.
pub async fn all_mcp_function_tools(
    servers: &[Arc<dyn McpServer>],
    agent: &Agent,
    strict: bool,
) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    let mut names: HashSet<String> = HashSet::new();
    for server in servers {
        let server_tools = mcp_function_tools(server, agent, strict).await?;
        for tool in &server_tools {
            if !names.insert(tool.name().to_string()) {
                return Err(ToolError::DuplicateName(tool.name().to_string()).into());
            }
        }
        tools.extend(server_tools);
    }
    Ok(tools)
}
