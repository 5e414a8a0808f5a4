//! Client configuration export
//!
//! Renders servers in the `mcpServers` JSON shape used by MCP client config
//! files

use crate::config::ResolvedServer;
use serde_json::{json, Map, Value};
use std::path::Path;

pub fn export_client_config(servers: &[ResolvedServer], self_exe: &Path) -> Value {
    let mut entries = Map::new();

    for server in servers {
        let spec = server.package.launch_spec(self_exe);

        let mut entry = json!({
            "command": spec.program,
            "args": spec.args,
        });
        if !spec.env.is_empty() {
            entry["env"] = json!(spec.env);
        }

        entries.insert(server.name().to_string(), entry);
    }

    json!({ "mcpServers": entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{get_default_configs, LaunchSource, Origin, ServerPackage};
    use std::collections::BTreeMap;

    #[test]
    fn test_export_builtin_and_command() {
        let echo = ResolvedServer {
            package: get_default_configs().remove("echo").unwrap(),
            origin: Origin::Builtin,
            enabled: true,
        };

        let mut env = BTreeMap::new();
        env.insert("TOKEN".to_string(), "abc".to_string());
        let custom = ResolvedServer {
            package: ServerPackage {
                name: "custom".to_string(),
                description: "custom".to_string(),
                homepage: None,
                licenses: vec![],
                tags: vec![],
                source: LaunchSource::Command {
                    command: "custom-mcp".to_string(),
                    args: vec!["--stdio".to_string()],
                },
                env,
                required_env: vec![],
            },
            origin: Origin::User,
            enabled: true,
        };

        let value = export_client_config(&[echo, custom], Path::new("/opt/cli-mcp"));

        assert_eq!(
            value["mcpServers"]["echo"],
            json!({"command": "/opt/cli-mcp", "args": ["serve", "echo"]})
        );
        assert_eq!(
            value["mcpServers"]["custom"],
            json!({"command": "custom-mcp", "args": ["--stdio"], "env": {"TOKEN": "abc"}})
        );
    }

    #[test]
    fn test_export_empty() {
        let value = export_client_config(&[], Path::new("/opt/cli-mcp"));
        assert_eq!(value, json!({"mcpServers": {}}));
    }
}
