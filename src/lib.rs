//! cli-mcp - command line manager for Model Context Protocol servers
//!
//! Keeps a registry of MCP servers (built-in, curated and user-defined),
//! hosts the built-in ones over stdio, and talks to any registered server
//! as an MCP client.

pub mod client;
pub mod config;
pub mod export;
pub mod mcp;
pub mod resolver;
pub mod servers;
pub mod types;

pub use client::McpClient;
pub use config::ConfigLoader;
pub use mcp::McpServer;
pub use types::CliError;

/// Crate version, or `"dev"` when built without package metadata
pub fn version() -> &'static str {
    resolve_version(option_env!("CARGO_PKG_VERSION"))
}

pub fn resolve_version(raw: Option<&'static str>) -> &'static str {
    match raw {
        Some(v) if !v.trim().is_empty() => v,
        _ => "dev",
    }
}
