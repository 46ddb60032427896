//! # Windlass Runner
//!
//! The execution loop: `Runner::run(agent, input)` drives a bounded
//! multi-turn conversation with a model backend, dispatches the tool
//! invocations the model requests, accumulates history (in-process or in a
//! caller-supplied session), and enforces input/output guardrails around
//! the whole run.

pub mod agent_tool;
pub mod runner;

pub use agent_tool::{AgentTool, delegation_tools};
pub use runner::{
    DEFAULT_MAX_TURNS, DEFAULT_ROUTING_THRESHOLD, DEFAULT_WORKFLOW_NAME, HandoffResolver,
    RunConfig, RunResult, Runner, run,
};
