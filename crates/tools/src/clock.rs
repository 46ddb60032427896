//! Current date/time tool.

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use windlass_core::error::ToolError;
use windlass_core::tool::Tool;

/// Returns the current date and time, optionally shifted by a UTC offset.
pub struct CurrentTimeTool;

#[derive(Deserialize, Default)]
struct TimeArgs {
    #[serde(default)]
    utc_offset_hours: Option<i32>,
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time. Defaults to UTC."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "integer",
                    "description": "Offset from UTC in hours (e.g. 9 for JST, -5 for EST). Default is 0."
                }
            }
        })
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<Value, ToolError> {
        let args: TimeArgs = if arguments.trim().is_empty() {
            TimeArgs::default()
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        let offset_hours = args.utc_offset_hours.unwrap_or(0);
        let offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ToolError::InvalidArguments(format!("invalid UTC offset: {offset_hours}"))
        })?;

        let now = Utc::now().with_timezone(&offset);
        Ok(Value::String(format!(
            "Current time: {}",
            now.format("%Y-%m-%d %H:%M:%S %:z")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_arguments_default_to_utc() {
        let result = CurrentTimeTool.invoke("").await.unwrap();
        let text = result.as_str().unwrap();
        assert!(text.starts_with("Current time: "));
        assert!(text.ends_with("+00:00"));
    }

    #[tokio::test]
    async fn offset_is_applied() {
        let result = CurrentTimeTool
            .invoke(r#"{"utc_offset_hours":9}"#)
            .await
            .unwrap();
        assert!(result.as_str().unwrap().ends_with("+09:00"));
    }

    #[tokio::test]
    async fn absurd_offset_is_invalid() {
        let err = CurrentTimeTool
            .invoke(r#"{"utc_offset_hours":99}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
