//! Keyword-based tool routing.
//!
//! When an agent resolves more tools than the routing threshold, the runner
//! asks the router to narrow the set using the run input as a relevance
//! signal. This router scores each tool by keyword hits; smarter routers
//! (embeddings, classifiers) implement [`ToolRouter`] themselves.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use windlass_core::error::ToolError;
use windlass_core::input::Input;
use windlass_core::tool::{Tool, ToolRouter};

const DEFAULT_TOP_N: usize = 5;

/// Routes tools by matching keywords in the input text.
#[derive(Debug, Clone, Default)]
pub struct KeywordRouter {
    /// Tool name to associated keywords.
    pub tool_keywords: HashMap<String, Vec<String>>,

    /// Max number of tools to return (0 means the default of 5).
    pub top_n: usize,
}

impl KeywordRouter {
    pub fn new(tool_keywords: HashMap<String, Vec<String>>) -> Self {
        Self {
            tool_keywords,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

#[async_trait]
impl ToolRouter for KeywordRouter {
    async fn route(
        &self,
        input: &Input,
        tools: Vec<Arc<dyn Tool>>,
    ) -> std::result::Result<Vec<Arc<dyn Tool>>, ToolError> {
        let input_lower = input.text().to_lowercase();

        let mut scored: Vec<(usize, Arc<dyn Tool>)> = tools
            .into_iter()
            .map(|tool| {
                let score = self
                    .tool_keywords
                    .get(tool.name())
                    .map(|keywords| {
                        keywords
                            .iter()
                            .filter(|k| input_lower.contains(&k.to_lowercase()))
                            .count()
                    })
                    .unwrap_or(0);
                (score, tool)
            })
            .collect();

        // Stable sort keeps the original order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let top_n = if self.top_n == 0 {
            DEFAULT_TOP_N
        } else {
            self.top_n
        };
        scored.truncate(top_n);

        Ok(scored.into_iter().map(|(_, tool)| tool).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windlass_core::tool::FunctionTool;

    fn named_tool(name: &str) -> Arc<dyn Tool> {
        Arc::new(FunctionTool::new(
            name,
            format!("the {name} tool"),
            serde_json::json!({"type": "object", "properties": {}}),
            |_| Ok(serde_json::Value::Null),
        ))
    }

    fn router() -> KeywordRouter {
        KeywordRouter::new(HashMap::from([
            (
                "get_weather".to_string(),
                vec!["weather".to_string(), "temperature".to_string()],
            ),
            (
                "send_email".to_string(),
                vec!["email".to_string(), "send".to_string()],
            ),
            (
                "search_db".to_string(),
                vec!["search".to_string(), "database".to_string()],
            ),
        ]))
        .with_top_n(3)
    }

    fn tool_set() -> Vec<Arc<dyn Tool>> {
        vec![
            named_tool("get_weather"),
            named_tool("send_email"),
            named_tool("search_db"),
            named_tool("other_tool1"),
            named_tool("other_tool2"),
        ]
    }

    #[tokio::test]
    async fn best_match_ranks_first() {
        let routed = router()
            .route(&Input::from("what is the weather in Tokyo"), tool_set())
            .await
            .unwrap();
        assert_eq!(routed.len(), 3);
        assert_eq!(routed[0].name(), "get_weather");
    }

    #[tokio::test]
    async fn email_keywords_route_to_email_tool() {
        let routed = router()
            .route(&Input::from("please send an email to Bob"), tool_set())
            .await
            .unwrap();
        assert_eq!(routed[0].name(), "send_email");
    }

    #[tokio::test]
    async fn ties_preserve_original_order() {
        let routed = router()
            .route(&Input::from("nothing relevant here"), tool_set())
            .await
            .unwrap();
        assert_eq!(routed[0].name(), "get_weather");
        assert_eq!(routed[1].name(), "send_email");
        assert_eq!(routed[2].name(), "search_db");
    }

    #[tokio::test]
    async fn zero_top_n_defaults_to_five() {
        let router = KeywordRouter {
            tool_keywords: HashMap::new(),
            top_n: 0,
        };
        let tools: Vec<Arc<dyn Tool>> = (0..8)
            .map(|i| named_tool(&format!("tool_{i}")))
            .collect();
        let routed = router.route(&Input::from("x"), tools).await.unwrap();
        assert_eq!(routed.len(), 5);
    }
}
