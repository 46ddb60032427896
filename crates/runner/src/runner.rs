//! The agent execution loop.
//!
//! One `run` call: clone the input, pass the input guardrails, then loop
//! turn by turn — resolve instructions and tools, call the backend through
//! one of its two call shapes, turn tool-call requests into tool-result
//! items (tool failures become conversation content, never process
//! errors), persist the turn, and stop when a message-type output item
//! yields a final output. Turn-budget exhaustion and guardrail tripwires
//! are typed terminal outcomes the caller can branch on.
//!
//! Cancellation is structural: dropping or timing out the `run` future
//! aborts the in-flight backend call, tool invocation, or session write.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use windlass_core::agent::{Agent, FinalOutput};
use windlass_core::error::{Error, Result, ToolError, TripwireError};
use windlass_core::guardrail::{InputGuardrail, InputGuardrailResult, OutputGuardrail, OutputGuardrailResult};
use windlass_core::input::Input;
use windlass_core::item::ConversationItem;
use windlass_core::model::{ModelRequest, ModelResponse, OutputItem, Usage};
use windlass_core::session::Session;
use windlass_core::settings::ModelSettings;
use windlass_core::tool::{Tool, ToolRouter, find_tool};
use windlass_tools::mcp::all_mcp_function_tools;

pub const DEFAULT_MAX_TURNS: u64 = 10;
pub const DEFAULT_ROUTING_THRESHOLD: usize = 5;
pub const DEFAULT_WORKFLOW_NAME: &str = "Agent workflow";

/// Maps agent names to agents when composing delegation tools.
/// The loop itself never switches agents; see [`crate::delegation_tools`].
#[async_trait]
pub trait HandoffResolver: Send + Sync {
    async fn resolve(&self, agent_name: &str) -> Result<Option<Agent>>;
}

/// Per-run overrides. Merges with agent-level settings using
/// "override wins when present" semantics; never mutates the agent.
#[derive(Clone, Default)]
pub struct RunConfig {
    /// Overrides the agent's model when set.
    pub model: Option<String>,

    /// Overrides agent model settings field by field.
    pub model_settings: ModelSettings,

    /// Run before the agent's own input guardrails.
    pub input_guardrails: Vec<InputGuardrail>,

    /// Run before the agent's own output guardrails.
    pub output_guardrails: Vec<OutputGuardrail>,

    /// Label used in logs for this run.
    pub workflow_name: Option<String>,

    /// Turn budget; 0 means the default of 10.
    pub max_turns: u64,

    /// Durable or ephemeral conversation history. Without one, history
    /// lives only for this run.
    pub session: Option<Arc<dyn Session>>,

    /// Resolver for composing delegation tools by agent name.
    pub handoff_resolver: Option<Arc<dyn HandoffResolver>>,

    /// Narrows large tool sets using the input as a relevance signal.
    pub tool_router: Option<Arc<dyn ToolRouter>>,

    /// Tool count above which the router kicks in; 0 means the default
    /// of 5.
    pub tool_routing_threshold: usize,
}

/// The complete results of an agent execution.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Copy of the original input, isolated from caller mutation.
    pub input: Input,

    /// Items generated during this run, in history order (each turn's
    /// tool results precede that turn's model output items).
    pub new_items: Vec<ConversationItem>,

    /// Raw model responses, one per turn.
    pub raw_responses: Vec<ModelResponse>,

    /// The final output, present on success.
    pub final_output: Option<FinalOutput>,

    pub input_guardrail_results: Vec<InputGuardrailResult>,
    pub output_guardrail_results: Vec<OutputGuardrailResult>,

    /// The name of the agent that produced the final output.
    pub last_agent: String,
}

impl RunResult {
    fn new(input: Input) -> Self {
        Self {
            input,
            new_items: Vec::new(),
            raw_responses: Vec::new(),
            final_output: None,
            input_guardrail_results: Vec::new(),
            output_guardrail_results: Vec::new(),
            last_agent: String::new(),
        }
    }

    /// The final output as text, if it is plain text.
    pub fn final_text(&self) -> Option<&str> {
        self.final_output.as_ref().and_then(FinalOutput::as_text)
    }

    /// Token usage aggregated across every turn of this run.
    pub fn total_usage(&self) -> Usage {
        let mut total = Usage::default();
        for response in &self.raw_responses {
            if let Some(usage) = &response.usage {
                total.add(usage);
            }
        }
        total
    }
}

/// Executes agents. The zero value is valid.
#[derive(Clone, Default)]
pub struct Runner {
    pub config: RunConfig,
}

/// Execute an agent with a default `Runner`.
pub async fn run(agent: &Agent, input: impl Into<Input>) -> Result<RunResult> {
    Runner::default().run(agent, input).await
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Execute the agent with the given input.
    pub async fn run(&self, agent: &Agent, input: impl Into<Input>) -> Result<RunResult> {
        let input = input.into();
        let workflow = self
            .config
            .workflow_name
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKFLOW_NAME.to_string());
        let mut result = RunResult::new(input.clone());

        // Input guardrails: run-config first, then agent-level, all against
        // the original input. First tripwire wins.
        for guardrail in self
            .config
            .input_guardrails
            .iter()
            .chain(agent.input_guardrails.iter())
        {
            let guardrail_result = guardrail.run(agent, &input).await?;
            let tripped = guardrail_result.output.tripwire_triggered;
            let info = guardrail_result.output.info.clone();
            result.input_guardrail_results.push(guardrail_result);
            if tripped {
                return Err(TripwireError {
                    guardrail: guardrail.name().to_string(),
                    info,
                    is_input: true,
                }
                .into());
            }
        }

        let backend = agent.backend.as_ref().ok_or_else(|| {
            Error::config(format!("agent '{}' has no model backend configured", agent.name))
        })?;

        let max_turns = if self.config.max_turns == 0 {
            DEFAULT_MAX_TURNS
        } else {
            self.config.max_turns
        };

        info!(workflow = %workflow, agent = %agent.name, max_turns, "run starting");

        let mut accumulated: Vec<ConversationItem> = Vec::new();
        let mut final_output: Option<FinalOutput> = None;

        for turn in 1..=max_turns {
            let model = self
                .config
                .model
                .clone()
                .unwrap_or_else(|| agent.model.clone());

            let instructions = match &agent.instructions {
                Some(instructions) => Some(instructions.resolve(agent).await?),
                None => None,
            };

            let mut tools = resolve_tools(agent).await?;

            let threshold = if self.config.tool_routing_threshold == 0 {
                DEFAULT_ROUTING_THRESHOLD
            } else {
                self.config.tool_routing_threshold
            };
            if let Some(router) = &self.config.tool_router {
                if tools.len() > threshold {
                    match router.route(&input, tools.clone()).await {
                        Ok(routed) => {
                            debug!(turn, routed = routed.len(), "tool routing applied");
                            tools = routed;
                        }
                        Err(e) => {
                            warn!(turn, error = %e, "tool routing failed, using the unfiltered set");
                        }
                    }
                }
            }

            let settings = agent.model_settings.resolve(&self.config.model_settings);

            let mut items = match &self.config.session {
                Some(session) => session.get_items(None).await.map_err(Error::Session)?,
                None => accumulated.clone(),
            };
            if turn == 1 {
                items.extend(input.to_items());
            }

            let mut request = ModelRequest {
                model: model.clone(),
                instructions,
                input: items,
                tools: tools.iter().map(|t| t.definition()).collect(),
                settings,
                prompt: None,
            };

            debug!(turn, model = %model, tools = request.tools.len(), "model call");

            let response = match &agent.prompt {
                Some(prompt_source) => {
                    let prompt = prompt_source.resolve(agent).await?;
                    if prompt.id.is_empty() {
                        return Err(Error::config("prompt is required but not provided"));
                    }
                    request.prompt = Some(prompt);
                    backend.respond(request).await.map_err(Error::Backend)?
                }
                None => backend.complete(request).await.map_err(Error::Backend)?,
            };

            result.raw_responses.push(response.clone());

            // Dispatch tool calls. Lookup and invocation failures become
            // conversation content so the model can retry or recover.
            let mut turn_items: Vec<ConversationItem> = Vec::new();
            for item in &response.output {
                if let OutputItem::ToolCall {
                    call_id,
                    name,
                    arguments,
                } = item
                {
                    let output = match find_tool(&tools, name) {
                        None => {
                            warn!(turn, tool = %name, "tool not found");
                            format!("Tool {name} not found")
                        }
                        Some(tool) => execute_tool(agent, tool.as_ref(), arguments).await,
                    };
                    turn_items.push(ConversationItem::tool_result(call_id.clone(), output));
                }
            }

            // The first message-type item is the candidate final output.
            for item in &response.output {
                if let OutputItem::Message { content } = item {
                    final_output = Some(agent.output_type.validate(content)?);
                    break;
                }
            }

            // Persist the turn: tool results first, then the model's own
            // output items.
            turn_items.extend(response.output.iter().map(OutputItem::to_conversation_item));
            if !turn_items.is_empty() {
                match &self.config.session {
                    Some(session) => session
                        .add_items(turn_items.clone())
                        .await
                        .map_err(Error::Session)?,
                    None => accumulated.extend(turn_items.iter().cloned()),
                }
                result.new_items.extend(turn_items);
            }

            if final_output.is_some() {
                debug!(turn, "final output produced");
                break;
            }
        }

        let Some(final_output) = final_output else {
            warn!(max_turns, agent = %agent.name, "run exhausted its turn budget");
            return Err(Error::MaxTurnsExceeded { max_turns });
        };

        // Output guardrails: run-config first, then agent-level, all
        // against the same final output.
        for guardrail in self
            .config
            .output_guardrails
            .iter()
            .chain(agent.output_guardrails.iter())
        {
            let guardrail_result = guardrail.run(agent, &final_output).await?;
            let tripped = guardrail_result.output.tripwire_triggered;
            let info = guardrail_result.output.info.clone();
            result.output_guardrail_results.push(guardrail_result);
            if tripped {
                return Err(TripwireError {
                    guardrail: guardrail.name().to_string(),
                    info,
                    is_input: false,
                }
                .into());
            }
        }

        result.final_output = Some(final_output);
        result.last_agent = agent.name.clone();

        info!(
            workflow = %workflow,
            agent = %agent.name,
            turns = result.raw_responses.len(),
            "run complete"
        );
        Ok(result)
    }
}

/// Resolve the agent's full tool set for one turn: MCP-discovered tools
/// first, then local tools. A duplicate name anywhere in the set is a
/// hard error raised before any model call.
async fn resolve_tools(agent: &Agent) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools = all_mcp_function_tools(
        &agent.mcp_servers,
        agent,
        agent.mcp_config.convert_schemas_to_strict,
    )
    .await?;
    tools.extend(agent.tools.iter().cloned());

    let mut seen: HashSet<&str> = HashSet::new();
    for tool in &tools {
        if !seen.insert(tool.name()) {
            return Err(ToolError::DuplicateName(tool.name().to_string()).into());
        }
    }
    Ok(tools)
}

/// Invoke a tool, mapping every failure (disabled, enablement-check
/// error, invocation error) to the LLM-visible message the tool chooses.
async fn execute_tool(agent: &Agent, tool: &dyn Tool, arguments: &str) -> String {
    match tool.is_enabled(agent).await {
        Ok(true) => {}
        Ok(false) => {
            let err = ToolError::Disabled(tool.name().to_string());
            warn!(tool = tool.name(), "tool invoked while disabled");
            return tool.failure_message(&err);
        }
        Err(e) => {
            warn!(tool = tool.name(), error = %e, "tool enablement check failed");
            return tool.failure_message(&e);
        }
    }

    let started = std::time::Instant::now();
    match tool.invoke(arguments).await {
        Ok(value) => {
            debug!(
                tool = tool.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "tool executed"
            );
            value_to_output(value)
        }
        Err(e) => {
            warn!(tool = tool.name(), error = %e, "tool execution failed");
            tool.failure_message(&e)
        }
    }
}

/// A string result passes through untouched; anything else is serialized.
fn value_to_output(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
