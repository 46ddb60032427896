//! # Windlass Core
//!
//! Domain types, traits, and error definitions for the Windlass agent
//! runtime. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (model backend, MCP server, session store)
//! is defined as a trait here. Implementations live in their respective
//! crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted mock backends
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod error;
pub mod guardrail;
pub mod input;
pub mod instruction;
pub mod item;
pub mod mcp;
pub mod model;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, FinalOutput, McpConfig, OutputType};
pub use error::{
    BackendError, Error, GuardrailError, McpError, Result, SessionError, ToolError, TripwireError,
};
pub use guardrail::{
    GuardrailOutput, InputGuardrail, InputGuardrailCheck, InputGuardrailResult, OutputGuardrail,
    OutputGuardrailCheck, OutputGuardrailResult,
};
pub use input::Input;
pub use instruction::{
    Instructions, InstructionsFn, InstructionSource, MemoryStateProvider, StateProvider,
    StatefulInstructions,
};
pub use item::{ConversationItem, Role};
pub use mcp::{McpFilterContext, McpServer, McpToolFilter, McpToolInfo, McpToolResult, StaticToolFilter};
pub use model::{ModelBackend, ModelRequest, ModelResponse, OutputItem, Usage};
pub use prompt::{Prompt, PromptProvider, PromptSource};
pub use session::Session;
pub use settings::{ModelSettings, ToolChoice, Truncation};
pub use tool::{
    FunctionTool, Tool, ToolDefinition, ToolRouter, default_tool_error_message, find_tool,
};
