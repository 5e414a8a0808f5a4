//! MCP servers hosted by the cli-mcp binary
//!
//! Each server is a [`ToolProvider`] registered under a fixed name, served
//! with `cli-mcp serve <name>`.

pub mod calc;
pub mod echo;
pub mod system;

use crate::mcp::tools::ToolProvider;
use std::sync::Arc;

pub const BUILTIN_SERVERS: &[&str] = &["calc", "echo", "system"];

/// Look up a built-in server by name
pub fn builtin(name: &str) -> Option<Arc<dyn ToolProvider>> {
    match name {
        "calc" => Some(Arc::new(calc::CalcServer)),
        "echo" => Some(Arc::new(echo::EchoServer)),
        "system" => Some(Arc::new(system::SystemServer)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_resolves() {
        for name in BUILTIN_SERVERS {
            let provider = builtin(name).unwrap();
            assert_eq!(provider.name(), *name);
            assert!(!provider.tools().is_empty());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin("fetch").is_none());
    }
}
