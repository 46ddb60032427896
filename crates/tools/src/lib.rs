//! Built-in tools and tool plumbing for the Windlass agent runtime.
//!
//! - built-in tools: calculator, current time, http fetch
//! - strict JSON-schema normalization for providers requiring strict mode
//! - adaptation of MCP-discovered tools into the uniform [`Tool`] shape
//! - a keyword-based tool router
//!
//! [`Tool`]: windlass_core::tool::Tool

pub mod calculator;
pub mod clock;
pub mod http_fetch;
pub mod mcp;
pub mod router;
pub mod strict;

use std::sync::Arc;
use windlass_core::tool::Tool;

pub use calculator::CalculatorTool;
pub use clock::CurrentTimeTool;
pub use http_fetch::HttpFetchTool;
pub use mcp::{McpFunctionTool, all_mcp_function_tools, mcp_function_tools};
pub use router::KeywordRouter;
pub use strict::ensure_strict_json_schema;

/// The default built-in tool set.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CalculatorTool),
        Arc::new(CurrentTimeTool),
        Arc::new(HttpFetchTool::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tools_have_unique_names() {
        let tools = default_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }
}
