//! Arithmetic server

use crate::mcp::protocol::{CallToolResult, Tool};
use crate::mcp::tools::{parse_args, unknown_tool, ToolProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub struct CalcServer;

#[derive(Debug, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

const OPERATIONS: &[(&str, &str)] = &[
    ("add", "Add two numbers (a + b)."),
    ("subtract", "Subtract b from a (a - b)."),
    ("multiply", "Multiply two numbers (a * b)."),
    ("divide", "Divide a by b (a / b). Fails when b is zero."),
];

fn compute(operation: &str, a: f64, b: f64) -> Result<f64, String> {
    let value = match operation {
        "add" => a + b,
        "subtract" => a - b,
        "multiply" => a * b,
        "divide" => {
            if b == 0.0 {
                return Err("Division by zero".to_string());
            }
            a / b
        }
        other => return Err(format!("Unsupported operation: {}", other)),
    };

    if !value.is_finite() {
        return Err(format!("Result of {} is not a finite number", operation));
    }

    Ok(value)
}

#[async_trait]
impl ToolProvider for CalcServer {
    fn name(&self) -> &str {
        "calc"
    }

    fn tools(&self) -> Vec<Tool> {
        OPERATIONS
            .iter()
            .map(|(name, description)| Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "a": { "type": "number", "description": "Left operand" },
                        "b": { "type": "number", "description": "Right operand" }
                    },
                    "required": ["a", "b"]
                }),
            })
            .collect()
    }

    async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        if !OPERATIONS.iter().any(|(op, _)| *op == name) {
            return unknown_tool(name);
        }

        let operands: Operands = match parse_args(arguments) {
            Ok(operands) => operands,
            Err(err) => return err,
        };

        match compute(name, operands.a, operands.b) {
            Ok(value) => CallToolResult::text(value.to_string()),
            Err(e) => CallToolResult::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add() {
        let result = CalcServer.call("add", json!({"a": 2, "b": 3})).await;
        assert_eq!(result.text_content(), "5");
    }

    #[tokio::test]
    async fn test_divide() {
        let result = CalcServer.call("divide", json!({"a": 7, "b": 2})).await;
        assert_eq!(result.text_content(), "3.5");
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let result = CalcServer.call("divide", json!({"a": 1, "b": 0})).await;
        assert!(result.is_error());
        assert_eq!(result.text_content(), "Division by zero");
    }

    #[tokio::test]
    async fn test_overflow_is_error() {
        let result = CalcServer
            .call("multiply", json!({"a": 1e308, "b": 1e308}))
            .await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_non_numeric_operand() {
        let result = CalcServer.call("subtract", json!({"a": "x", "b": 1})).await;
        assert!(result.is_error());
        assert!(result.text_content().starts_with("Invalid arguments"));
    }

    #[test]
    fn test_tools_match_operations() {
        let tools = CalcServer.tools();
        assert_eq!(tools.len(), OPERATIONS.len());
    }
}
