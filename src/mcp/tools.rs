//! Tool provider abstraction shared by all hosted servers

use crate::mcp::protocol::{CallToolResult, Tool};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A set of MCP tools served under one server name
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Server name reported in `initialize`
    fn name(&self) -> &str;

    /// Optional usage hint returned to clients on `initialize`
    fn instructions(&self) -> Option<&str> {
        None
    }

    fn tools(&self) -> Vec<Tool>;

    async fn call(&self, name: &str, arguments: Value) -> CallToolResult;
}

/// Deserialize tool arguments, turning failures into an error result
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CallToolResult> {
    // Clients may send null or omit arguments for tools without parameters
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };

    serde_json::from_value(args)
        .map_err(|e| CallToolResult::error(format!("Invalid arguments: {}", e)))
}

pub fn unknown_tool(name: &str) -> CallToolResult {
    CallToolResult::error(format!("Unknown tool: {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        message: String,
    }

    #[derive(Debug, Deserialize)]
    struct NoArgs {}

    #[test]
    fn test_parse_args_ok() {
        let args: Args = parse_args(json!({"message": "hi"})).unwrap();
        assert_eq!(args.message, "hi");
    }

    #[test]
    fn test_parse_args_missing_field() {
        let err = parse_args::<Args>(json!({})).unwrap_err();
        assert!(err.is_error());
        assert!(err.text_content().starts_with("Invalid arguments:"));
    }

    #[test]
    fn test_parse_args_null_for_empty_struct() {
        assert!(parse_args::<NoArgs>(Value::Null).is_ok());
    }
}
