//! Echo server, mostly useful for exercising MCP clients

use crate::mcp::protocol::{CallToolResult, Tool};
use crate::mcp::tools::{parse_args, unknown_tool, ToolProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub struct EchoServer;

#[derive(Debug, Deserialize)]
struct EchoArgs {
    message: String,
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseArgs {
    message: String,
}

#[async_trait]
impl ToolProvider for EchoServer {
    fn name(&self) -> &str {
        "echo"
    }

    fn instructions(&self) -> Option<&str> {
        Some("Returns messages unchanged (echo) or reversed (reverse).")
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "echo".to_string(),
                description: "Echo a message back to the client.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to echo"
                        },
                        "prefix": {
                            "type": "string",
                            "description": "Optional text prepended to the message"
                        }
                    },
                    "required": ["message"]
                }),
            },
            Tool {
                name: "reverse".to_string(),
                description: "Return the message with its characters in reverse order.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to reverse"
                        }
                    },
                    "required": ["message"]
                }),
            },
        ]
    }

    async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        match name {
            "echo" => match parse_args::<EchoArgs>(arguments) {
                Ok(args) => match args.prefix {
                    Some(prefix) => CallToolResult::text(format!("{}{}", prefix, args.message)),
                    None => CallToolResult::text(args.message),
                },
                Err(err) => err,
            },
            "reverse" => match parse_args::<ReverseArgs>(arguments) {
                Ok(args) => CallToolResult::text(args.message.chars().rev().collect::<String>()),
                Err(err) => err,
            },
            _ => unknown_tool(name),
        }
    }
}
