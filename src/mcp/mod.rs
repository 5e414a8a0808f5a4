//! MCP protocol types and the stdio server

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::ToolProvider;
