//! Built-in server definitions
//!
//! These are hosted by the cli-mcp binary itself and need no external tooling

use crate::config::registry::{LaunchSource, ServerPackage};
use std::collections::{BTreeMap, HashMap};

pub fn get_default_configs() -> HashMap<String, ServerPackage> {
    let mut configs = HashMap::new();

    configs.insert("echo".to_string(), echo_config());
    configs.insert("calc".to_string(), calc_config());
    configs.insert("system".to_string(), system_config());

    configs
}

fn builtin(name: &str, description: &str, tags: &[&str]) -> ServerPackage {
    ServerPackage {
        name: name.to_string(),
        description: description.to_string(),
        homepage: None,
        licenses: vec!["MIT".to_string(), "Apache-2.0".to_string()],
        tags: tags.iter().map(|t| t.to_string()).collect(),
        source: LaunchSource::Builtin {
            server: name.to_string(),
        },
        env: BTreeMap::new(),
        required_env: vec![],
    }
}

fn echo_config() -> ServerPackage {
    builtin(
        "echo",
        "Echo messages back to the client, handy for testing MCP clients",
        &["testing", "builtin"],
    )
}

fn calc_config() -> ServerPackage {
    builtin(
        "calc",
        "Basic arithmetic on two numbers",
        &["math", "builtin"],
    )
}

fn system_config() -> ServerPackage {
    builtin(
        "system",
        "Current time and host platform information",
        &["time", "builtin"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_configs() {
        let configs = get_default_configs();
        assert!(configs.contains_key("echo"));
        assert!(configs.contains_key("calc"));
        assert!(configs.contains_key("system"));
    }

    #[test]
    fn test_defaults_are_builtin() {
        for (key, pkg) in get_default_configs() {
            assert_eq!(key, pkg.name);
            match pkg.source {
                LaunchSource::Builtin { server } => assert_eq!(server, key),
                other => panic!("unexpected source for {}: {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_defaults_have_hosted_servers() {
        for name in get_default_configs().keys() {
            assert!(
                crate::servers::builtin(name).is_some(),
                "no built-in server for {}",
                name
            );
        }
    }
}
