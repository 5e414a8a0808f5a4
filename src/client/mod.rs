//! MCP client used to probe and call registered servers

mod client;

pub use client::{parse_tool_arguments, McpClient};
