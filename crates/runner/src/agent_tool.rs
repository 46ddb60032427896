//! Multi-agent composition — wrapping an agent as a callable tool.
//!
//! The wrapped agent runs a nested, bounded `run` per invocation and its
//! final output becomes the tool result. Unbounded mutual delegation
//! between agents is the caller's responsibility to avoid; each nested run
//! is bounded by its own turn budget, which is a soft ceiling, not cycle
//! detection.

use crate::runner::{DEFAULT_MAX_TURNS, HandoffResolver, RunConfig, Runner};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use windlass_core::agent::{Agent, FinalOutput};
use windlass_core::error::{Error, Result, ToolError};
use windlass_core::instruction::Instructions;
use windlass_core::tool::Tool;

/// An agent exposed as a tool of another agent.
pub struct AgentTool {
    agent: Agent,
    max_turns: u64,
    name: String,
    description: String,
}

impl AgentTool {
    /// Wrap `agent` as a tool. `max_turns` of 0 means the default of 10.
    pub fn new(agent: Agent, max_turns: u64) -> Self {
        let max_turns = if max_turns == 0 {
            DEFAULT_MAX_TURNS
        } else {
            max_turns
        };
        let name = format!("call_agent_{}", agent.name);
        let description = format!(
            "Call agent '{}' to handle a task. {}",
            agent.name,
            agent_description(&agent)
        );
        Self {
            agent,
            max_turns,
            name,
            description,
        }
    }
}

#[derive(Deserialize)]
struct AgentToolArgs {
    input: String,
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The input message to pass to the agent"
                }
            },
            "required": ["input"]
        })
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<Value, ToolError> {
        let args: AgentToolArgs = serde_json::from_str(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let runner = Runner::new(RunConfig {
            max_turns: self.max_turns,
            ..Default::default()
        });
        let result = runner
            .run(&self.agent, args.input)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: format!("run agent '{}': {e}", self.agent.name),
            })?;

        Ok(match result.final_output {
            Some(FinalOutput::Text(text)) => Value::String(text),
            Some(FinalOutput::Json(value)) => value,
            None => Value::Null,
        })
    }
}

/// A short description of what the wrapped agent does, taken from its
/// static instructions when available.
fn agent_description(agent: &Agent) -> String {
    if let Some(Instructions::Static(text)) = &agent.instructions {
        if text.len() > 100 {
            let cut: String = text.chars().take(100).collect();
            return format!("{cut}...");
        }
        return text.clone();
    }
    format!("Delegate tasks to the {} agent", agent.name)
}

/// Build delegation tools from a handoff resolver: one wrapped agent per
/// name. An unresolvable name is a configuration error.
pub async fn delegation_tools(
    resolver: &dyn HandoffResolver,
    agent_names: &[&str],
    max_turns: u64,
) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(agent_names.len());
    for name in agent_names {
        let agent = resolver.resolve(name).await?.ok_or_else(|| {
            Error::config(format!("handoff resolver knows no agent named '{name}'"))
        })?;
        tools.push(Arc::new(AgentTool::new(agent, max_turns)));
    }
    Ok(tools)
}
