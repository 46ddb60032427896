//! Stdio MCP client for the Windlass agent runtime.
//!
//! Implements the [`McpServer`] contract over a child process speaking
//! newline-delimited JSON-RPC: spawn, `initialize`, then `tools/list` and
//! `tools/call` correlated by request id. The runtime core only depends on
//! the contract; everything in here is transport plumbing.
//!
//! [`McpServer`]: windlass_core::mcp::McpServer

pub mod stdio;

pub use stdio::{StdioMcpServer, StdioMcpServerConfig};
