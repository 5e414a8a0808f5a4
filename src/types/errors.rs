use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("MCP server could not be started: {0}. {1}")]
    ServerNotFound(String, String),

    #[error("MCP server exited unexpectedly: {0}")]
    ServerCrashed(String),

    #[error("Request timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Unknown server: {0}")]
    UnknownServer(String),

    #[error("MCP protocol error: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
