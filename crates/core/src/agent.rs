//! Agent descriptor — immutable-per-run configuration.
//!
//! An `Agent` bundles a model identity, an instruction source, tools,
//! guardrails and MCP server handles. It is built once with the `with_*`
//! methods and treated as read-only by the runner, so a single descriptor
//! can be shared across concurrent runs and wrapped as a tool of another
//! agent.

use crate::error::{Error, Result};
use crate::guardrail::{InputGuardrail, OutputGuardrail};
use crate::instruction::{Instructions, StatefulInstructions};
use crate::mcp::McpServer;
use crate::model::ModelBackend;
use crate::prompt::{Prompt, PromptProvider, PromptSource};
use crate::settings::ModelSettings;
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for an agent's MCP servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpConfig {
    /// Convert discovered tool schemas to the strict subset (best-effort is
    /// not an option: a schema that cannot be converted is a setup error).
    pub convert_schemas_to_strict: bool,
}

/// The expected shape of an agent's final output.
#[derive(Debug, Clone, Default)]
pub enum OutputType {
    /// Plain text (the default).
    #[default]
    Text,

    /// A JSON object validated against a schema.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

impl OutputType {
    pub fn is_plain_text(&self) -> bool {
        matches!(self, OutputType::Text)
    }

    /// Validate raw model output against this type.
    ///
    /// For JSON output types, unparseable output is a model-behavior error.
    pub fn validate(&self, raw: &str) -> Result<FinalOutput> {
        match self {
            OutputType::Text => Ok(FinalOutput::Text(raw.to_string())),
            OutputType::JsonSchema { name, .. } => {
                let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
                    Error::ModelBehavior(format!(
                        "output does not parse as JSON for output type '{name}': {e}"
                    ))
                })?;
                Ok(FinalOutput::Json(value))
            }
        }
    }
}

/// The final output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalOutput {
    Text(String),
    Json(serde_json::Value),
}

impl FinalOutput {
    /// The output as text, if it is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FinalOutput::Text(text) => Some(text),
            FinalOutput::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            FinalOutput::Json(value) => Some(value),
            FinalOutput::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FinalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalOutput::Text(text) => write!(f, "{text}"),
            FinalOutput::Json(value) => write!(f, "{value}"),
        }
    }
}

/// An AI model configured with instructions, tools, guardrails and more.
#[derive(Clone, Debug)]
pub struct Agent {
    /// The agent identifier.
    pub name: String,

    /// The system prompt source, if any.
    pub instructions: Option<Instructions>,

    /// Server-side prompt configuration. When present, the runner uses the
    /// stateful prompt call shape instead of chat.
    pub prompt: Option<PromptSource>,

    /// The model name (e.g. "gpt-4o-mini").
    pub model: String,

    /// The backend used for model calls.
    pub backend: Option<Arc<dyn ModelBackend>>,

    /// Model tuning parameters.
    pub model_settings: ModelSettings,

    /// Function tools available to this agent.
    pub tools: Vec<Arc<dyn Tool>>,

    /// MCP servers providing additional tools. Callers connect them before
    /// a run and clean them up after.
    pub mcp_servers: Vec<Arc<dyn McpServer>>,

    pub mcp_config: McpConfig,

    /// Checks run before the first model call.
    pub input_guardrails: Vec<InputGuardrail>,

    /// Checks run on the final output.
    pub output_guardrails: Vec<OutputGuardrail>,

    /// The expected output format (defaults to plain text).
    pub output_type: OutputType,
}

impl Agent {
    /// Create a new agent with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            prompt: None,
            model: String::new(),
            backend: None,
            model_settings: ModelSettings::default(),
            tools: Vec::new(),
            mcp_servers: Vec::new(),
            mcp_config: McpConfig::default(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            output_type: OutputType::Text,
        }
    }

    /// Set static instructions (system prompt).
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(Instructions::Static(instructions.into()));
        self
    }

    /// Set a custom instruction source.
    pub fn with_instruction_source(mut self, source: Instructions) -> Self {
        self.instructions = Some(source);
        self
    }

    /// Set stateful template instructions.
    pub fn with_stateful_instructions(mut self, stateful: StatefulInstructions) -> Self {
        self.instructions = Some(Instructions::Stateful(stateful));
        self
    }

    /// Set a static prompt reference.
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(PromptSource::Static(prompt));
        self
    }

    /// Set a dynamic prompt provider.
    pub fn with_prompt_provider(mut self, provider: Arc<dyn PromptProvider>) -> Self {
        self.prompt = Some(PromptSource::Dynamic(provider));
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the model backend.
    pub fn with_backend(mut self, backend: Arc<dyn ModelBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set model parameters.
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Append a tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Append multiple tools.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Append an MCP server.
    pub fn with_mcp_server(mut self, server: Arc<dyn McpServer>) -> Self {
        self.mcp_servers.push(server);
        self
    }

    pub fn with_mcp_config(mut self, config: McpConfig) -> Self {
        self.mcp_config = config;
        self
    }

    /// Append an input guardrail.
    pub fn with_input_guardrail(mut self, guardrail: InputGuardrail) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    /// Append an output guardrail.
    pub fn with_output_guardrail(mut self, guardrail: OutputGuardrail) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    /// Set the expected output type.
    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }
}
