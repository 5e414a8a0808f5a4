//! MCP server package registry types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerPackage {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: LaunchSource,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub required_env: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LaunchSource {
    Builtin {
        server: String,
    },
    Npx {
        package: String,
        version: Option<String>,
        #[serde(default)]
        args: Vec<String>,
    },
    Uvx {
        package: String,
        version: Option<String>,
        #[serde(default)]
        args: Vec<String>,
    },
    Docker {
        image: String,
        tag: Option<String>,
        #[serde(default)]
        args: Vec<String>,
    },
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl LaunchSource {
    /// Short label used in listings
    pub fn kind(&self) -> &'static str {
        match self {
            LaunchSource::Builtin { .. } => "builtin",
            LaunchSource::Npx { .. } => "npx",
            LaunchSource::Uvx { .. } => "uvx",
            LaunchSource::Docker { .. } => "docker",
            LaunchSource::Command { .. } => "command",
        }
    }
}

/// A concrete process invocation for an MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Render as a shell-like command line for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ServerPackage {
    /// Build the process invocation for this package.
    ///
    /// `self_exe` is the path of the running `cli-mcp` binary, used to host
    /// built-in servers.
    pub fn launch_spec(&self, self_exe: &Path) -> LaunchSpec {
        let env = self.env.clone();

        let (program, args) = match &self.source {
            LaunchSource::Builtin { server } => (
                self_exe.display().to_string(),
                vec!["serve".to_string(), server.clone()],
            ),
            LaunchSource::Npx {
                package,
                version,
                args,
            } => {
                let target = match version {
                    Some(v) => format!("{}@{}", package, v),
                    None => package.clone(),
                };
                let mut full = vec!["-y".to_string(), target];
                full.extend(args.iter().cloned());
                ("npx".to_string(), full)
            }
            LaunchSource::Uvx {
                package,
                version,
                args,
            } => {
                let target = match version {
                    Some(v) => format!("{}=={}", package, v),
                    None => package.clone(),
                };
                let mut full = vec![target];
                full.extend(args.iter().cloned());
                ("uvx".to_string(), full)
            }
            LaunchSource::Docker { image, tag, args } => {
                let mut full = vec!["run".to_string(), "-i".to_string(), "--rm".to_string()];

                // Forward every variable the container needs from the host
                let mut keys: Vec<&String> = self.env.keys().collect();
                for key in &self.required_env {
                    if !self.env.contains_key(key) {
                        keys.push(key);
                    }
                }
                for key in keys {
                    full.push("-e".to_string());
                    full.push(key.clone());
                }

                full.push(match tag {
                    Some(t) => format!("{}:{}", image, t),
                    None => image.clone(),
                });
                full.extend(args.iter().cloned());
                ("docker".to_string(), full)
            }
            LaunchSource::Command { command, args } => (command.clone(), args.clone()),
        };

        LaunchSpec { program, args, env }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, LaunchSource::Builtin { .. })
    }
}

/// Where a resolved server definition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Builtin,
    Registry,
    User,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Builtin => write!(f, "builtin"),
            Origin::Registry => write!(f, "registry"),
            Origin::User => write!(f, "user"),
        }
    }
}

/// A server definition after all configuration tiers were applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedServer {
    pub package: ServerPackage,
    pub origin: Origin,
    pub enabled: bool,
}

impl ResolvedServer {
    pub fn name(&self) -> &str {
        &self.package.name
    }
}
