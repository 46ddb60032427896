//! Basic arithmetic tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use windlass_core::error::ToolError;
use windlass_core::tool::Tool;

/// Performs basic math operations: add, subtract, multiply, divide.
pub struct CalculatorTool;

#[derive(Deserialize)]
struct CalculatorArgs {
    operation: String,
    a: f64,
    b: f64,
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic math operations: add, subtract, multiply, divide"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The math operation to perform"
                },
                "a": { "type": "number", "description": "First operand" },
                "b": { "type": "number", "description": "Second operand" }
            },
            "required": ["operation", "a", "b"]
        })
    }

    async fn invoke(&self, arguments: &str) -> std::result::Result<Value, ToolError> {
        let args: CalculatorArgs = serde_json::from_str(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let result = match args.operation.as_str() {
            "add" => args.a + args.b,
            "subtract" => args.a - args.b,
            "multiply" => args.a * args.b,
            "divide" => {
                if args.b == 0.0 {
                    // Reported as normal output so the model can recover.
                    return Ok(Value::String("Error: division by zero".to_string()));
                }
                args.a / args.b
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "unknown operation: {other}"
                )));
            }
        };

        Ok(Value::String(format!("{result}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adds_numbers() {
        let result = CalculatorTool
            .invoke(r#"{"operation":"add","a":2,"b":3}"#)
            .await
            .unwrap();
        assert_eq!(result, "5");
    }

    #[tokio::test]
    async fn multiplies_numbers() {
        let result = CalculatorTool
            .invoke(r#"{"operation":"multiply","a":10,"b":5}"#)
            .await
            .unwrap();
        assert_eq!(result, "50");
    }

    #[tokio::test]
    async fn division_by_zero_is_reported_not_raised() {
        let result = CalculatorTool
            .invoke(r#"{"operation":"divide","a":1,"b":0}"#)
            .await
            .unwrap();
        assert_eq!(result, "Error: division by zero");
    }

    #[tokio::test]
    async fn unknown_operation_is_invalid_arguments() {
        let err = CalculatorTool
            .invoke(r#"{"operation":"modulo","a":1,"b":2}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_operands_are_invalid_arguments() {
        let err = CalculatorTool
            .invoke(r#"{"operation":"add"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
