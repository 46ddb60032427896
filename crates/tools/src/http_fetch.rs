//! Web fetch tool — GET a URL and return its text content.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use windlass_core::error::ToolError;
use windlass_core::tool::Tool;

// Responses are capped so a large page cannot blow up the conversation.
const MAX_RESPONSE_BYTES: usize = 100 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches content from a web URL.
///
/// Enforces its own bounded duration; a timeout is reported as a normal
/// tool error, not a process abort.
pub struct HttpFetchTool {
    client: reqwest::Client,
}

impl HttpFetchTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("windlass-agent/0.1")
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct FetchArgs {
    url: String,
}

#[async_trait]
impl Tool for HttpFetchTool {
    fn name(&self) -> &str {
        "http_fetch"
    }

    fn description(&self) -> &str {
        "Fetch content from a web URL. Returns the raw text content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch content from"
                }
            },
            "required": ["url"]
        })
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<Value, ToolError> {
        let args: FetchArgs = serde_json::from_str(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        if args.url.is_empty() {
            return Err(ToolError::InvalidArguments("url is required".to_string()));
        }
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(format!(
                "invalid url: {}",
                args.url
            )));
        }

        debug!(url = %args.url, "Fetching URL");

        let response = self
            .client
            .get(&args.url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "http_fetch".to_string(),
                reason: format!("fetch failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "http_fetch".to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "http_fetch".to_string(),
                reason: format!("read body: {e}"),
            })?;

        let capped = &bytes[..bytes.len().min(MAX_RESPONSE_BYTES)];
        Ok(Value::String(String::from_utf8_lossy(capped).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_is_invalid() {
        let err = HttpFetchTool::new().invoke("{}").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn non_http_scheme_is_invalid() {
        let err = HttpFetchTool::new()
            .invoke(r#"{"url":"file:///etc/passwd"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn schema_requires_url() {
        let schema = HttpFetchTool::new().parameters_schema();
        assert_eq!(schema["required"][0], "url");
    }
}
