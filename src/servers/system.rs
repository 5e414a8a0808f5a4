//! Time and platform information server

use crate::mcp::protocol::{CallToolResult, Tool};
use crate::mcp::tools::{parse_args, unknown_tool, ToolProvider};
use crate::version;
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, Utc};
use serde::Deserialize;
use serde_json::Value;

pub struct SystemServer;

#[derive(Debug, Deserialize)]
struct CurrentTimeArgs {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    utc: bool,
}

#[derive(Debug, Deserialize)]
struct PlatformInfoArgs {}

fn current_time(args: CurrentTimeArgs) -> CallToolResult {
    let Some(format) = args.format else {
        let now = if args.utc {
            Utc::now().to_rfc3339()
        } else {
            Local::now().to_rfc3339()
        };
        return CallToolResult::text(now);
    };

    // chrono panics while rendering an invalid format, so validate first
    let items: Vec<Item> = StrftimeItems::new(&format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return CallToolResult::error(format!("Invalid time format: {}", format));
    }

    let rendered = if args.utc {
        Utc::now().format_with_items(items.iter()).to_string()
    } else {
        Local::now().format_with_items(items.iter()).to_string()
    };
    CallToolResult::text(rendered)
}

fn platform_info() -> CallToolResult {
    let info = serde_json::json!({
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "family": std::env::consts::FAMILY,
        "cli_mcp_version": version(),
    });

    match serde_json::to_string_pretty(&info) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error(format!("Failed to render platform info: {}", e)),
    }
}

#[async_trait]
impl ToolProvider for SystemServer {
    fn name(&self) -> &str {
        "system"
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "current_time".to_string(),
                description: "Get the current date and time. RFC 3339 unless a strftime format is given.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "format": {
                            "type": "string",
                            "description": "strftime format string, e.g. %Y-%m-%d"
                        },
                        "utc": {
                            "type": "boolean",
                            "description": "Use UTC instead of local time",
                            "default": false
                        }
                    }
                }),
            },
            Tool {
                name: "platform_info".to_string(),
                description: "Describe the host operating system and architecture.".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    }

    async fn call(&self, name: &str, arguments: Value) -> CallToolResult {
        match name {
            "current_time" => match parse_args::<CurrentTimeArgs>(arguments) {
                Ok(args) => current_time(args),
                Err(err) => err,
            },
            "platform_info" => match parse_args::<PlatformInfoArgs>(arguments) {
                Ok(_) => platform_info(),
                Err(err) => err,
            },
            _ => unknown_tool(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::json;

    #[tokio::test]
    async fn test_current_time_default_is_rfc3339() {
        let result = SystemServer.call("current_time", json!({"utc": true})).await;
        assert!(!result.is_error());
        assert!(DateTime::parse_from_rfc3339(&result.text_content()).is_ok());
    }

    #[tokio::test]
    async fn test_current_time_with_format() {
        let result = SystemServer
            .call("current_time", json!({"format": "%Y", "utc": true}))
            .await;
        let year: i32 = result.text_content().parse().unwrap();
        assert!(year >= 2024);
    }

    #[tokio::test]
    async fn test_current_time_invalid_format() {
        let result = SystemServer
            .call("current_time", json!({"format": "%Q"}))
            .await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_platform_info() {
        let result = SystemServer.call("platform_info", Value::Null).await;
        let info: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(info["os"], std::env::consts::OS);
        assert_eq!(info["cli_mcp_version"], version());
    }
}
