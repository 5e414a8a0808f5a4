//! Configuration loader with 3-tier precedence
//!
//! Priority order (highest to lowest):
//! 1. User config (.cli-mcp.toml, $CLI_MCP_CONFIG or ~/.config/cli-mcp/config.toml)
//! 2. Server registry (embedded TOML files)
//! 3. Built-in defaults (servers hosted by this binary)

use crate::config::{get_default_configs, LaunchSource, Origin, ResolvedServer, ServerEntry};
use crate::config::{ServerPackage, UserConfig};
use crate::types::CliError;
use include_dir::{include_dir, Dir};
use path_clean::PathClean;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

// Embed the registry directory at compile time
static REGISTRY_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/registry");

pub const CONFIG_ENV_VAR: &str = "CLI_MCP_CONFIG";
pub const PROJECT_CONFIG_FILE: &str = ".cli-mcp.toml";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct ConfigLoader {
    defaults: HashMap<String, ServerPackage>,
    registry: HashMap<String, ServerPackage>,
    user_config: UserConfig,
    user_config_path: PathBuf,
}

impl ConfigLoader {
    /// Load using the default config file discovery
    pub fn new() -> Result<Self, CliError> {
        Self::load(None)
    }

    /// Load, reading the user config from `explicit_path` when given
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, CliError> {
        let defaults = get_default_configs();
        debug!("Loaded {} built-in server definitions", defaults.len());

        let registry = Self::load_registry()?;
        debug!("Loaded {} server definitions from registry", registry.len());

        let (user_config, user_config_path) = match explicit_path {
            Some(path) => {
                let path = path.to_path_buf().clean();
                (UserConfig::load(&path)?, path)
            }
            None => Self::discover_user_config()?,
        };

        if !user_config.servers.is_empty() {
            info!(
                "Loaded {} user server entries from {}",
                user_config.servers.len(),
                user_config_path.display()
            );
        }

        Ok(Self::from_parts(defaults, registry, user_config, user_config_path))
    }

    pub fn from_parts(
        defaults: HashMap<String, ServerPackage>,
        registry: HashMap<String, ServerPackage>,
        user_config: UserConfig,
        user_config_path: PathBuf,
    ) -> Self {
        Self {
            defaults,
            registry,
            user_config,
            user_config_path,
        }
    }

    fn load_registry() -> Result<HashMap<String, ServerPackage>, CliError> {
        let mut registry = HashMap::new();

        for file in REGISTRY_DIR.files() {
            let Some(file_name) = file.path().file_name() else {
                continue;
            };
            let file_name_str = file_name.to_string_lossy();

            if !file_name_str.ends_with(".toml") {
                continue;
            }

            let content = file.contents_utf8().ok_or_else(|| {
                CliError::ConfigError(format!("Invalid UTF-8 in {}", file_name_str))
            })?;

            match toml::from_str::<ServerPackage>(content) {
                Ok(package) => {
                    debug!("Loaded registry entry: {}", package.name);
                    registry.insert(package.name.clone(), package);
                }
                Err(e) => {
                    warn!("Failed to parse registry file {}: {}", file_name_str, e);
                }
            }
        }

        Ok(registry)
    }

    /// Find the user config and the path edits should be written to.
    fn discover_user_config() -> Result<(UserConfig, PathBuf), CliError> {
        let project = std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(PROJECT_CONFIG_FILE));
        let from_env = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(|v| PathBuf::from(v).clean());

        discover_in(project, from_env, global_config_path())
    }

    pub fn user_config(&self) -> &UserConfig {
        &self.user_config
    }

    /// Path the user config is read from and written to
    pub fn user_config_path(&self) -> &Path {
        &self.user_config_path
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.user_config
                .request_timeout_secs()
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Whether `name` is defined by the built-in defaults or the registry
    pub fn is_known(&self, name: &str) -> bool {
        self.base_package(name).is_some()
    }

    fn base_package(&self, name: &str) -> Option<(&ServerPackage, Origin)> {
        if let Some(pkg) = self.defaults.get(name) {
            return Some((pkg, Origin::Builtin));
        }
        self.registry.get(name).map(|pkg| (pkg, Origin::Registry))
    }

    /// Resolve a server by name with all tiers applied
    pub fn resolve(&self, name: &str) -> Result<ResolvedServer, CliError> {
        let entry = self.user_config.servers.get(name);

        match (self.base_package(name), entry) {
            (Some((pkg, origin)), None) => Ok(ResolvedServer {
                package: pkg.clone(),
                origin,
                enabled: true,
            }),
            (Some((pkg, origin)), Some(entry)) => Ok(apply_override(pkg, origin, entry)),
            (None, Some(entry)) => custom_server(name, entry),
            (None, None) => Err(CliError::UnknownServer(name.to_string())),
        }
    }

    /// List servers sorted by name
    pub fn list_servers(&self, include_disabled: bool) -> Vec<ResolvedServer> {
        let names: BTreeSet<&String> = self
            .defaults
            .keys()
            .chain(self.registry.keys())
            .chain(self.user_config.servers.keys())
            .collect();

        names
            .into_iter()
            .filter_map(|name| match self.resolve(name) {
                Ok(server) => Some(server),
                Err(e) => {
                    warn!("Skipping server '{}': {}", name, e);
                    None
                }
            })
            .filter(|server| include_disabled || server.enabled)
            .collect()
    }

    /// Case-insensitive search over names, descriptions and tags
    pub fn search(&self, query: &str) -> Vec<ResolvedServer> {
        let query = query.to_lowercase();

        self.list_servers(true)
            .into_iter()
            .filter(|server| {
                let pkg = &server.package;
                pkg.name.to_lowercase().contains(&query)
                    || pkg.description.to_lowercase().contains(&query)
                    || pkg.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect()
    }
}

/// Reads the first existing of: project file, $CLI_MCP_CONFIG, the global
/// config, and writes back to that same file. With none present, writes go
/// to $CLI_MCP_CONFIG when set, else the global config, else the project file.
fn discover_in(
    project: Option<PathBuf>,
    from_env: Option<PathBuf>,
    global: Option<PathBuf>,
) -> Result<(UserConfig, PathBuf), CliError> {
    for path in [&project, &from_env, &global].into_iter().flatten() {
        if path.exists() {
            debug!("Loading user config from: {}", path.display());
            return Ok((UserConfig::load(path)?, path.clone()));
        }
    }

    debug!("No user config file found");
    let write_target = from_env
        .or(global)
        .or(project)
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    Ok((UserConfig::default(), write_target))
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cli-mcp").join("config.toml"))
}

fn apply_override(base: &ServerPackage, origin: Origin, entry: &ServerEntry) -> ResolvedServer {
    let mut package = base.clone();
    let mut origin = origin;

    if let Some(description) = &entry.description {
        package.description = description.clone();
    }

    for (key, value) in &entry.env {
        package.env.insert(key.clone(), value.clone());
    }

    if let Some(command) = &entry.command {
        debug!("User override replaces command for {}", package.name);
        package.source = LaunchSource::Command {
            command: command.clone(),
            args: entry.args.clone().unwrap_or_default(),
        };
        origin = Origin::User;
    } else if let Some(args) = &entry.args {
        package.source = replace_args(package.source, args.clone());
    }

    ResolvedServer {
        package,
        origin,
        enabled: entry.enabled.unwrap_or(true),
    }
}

fn replace_args(source: LaunchSource, new_args: Vec<String>) -> LaunchSource {
    match source {
        LaunchSource::Npx {
            package, version, ..
        } => LaunchSource::Npx {
            package,
            version,
            args: new_args,
        },
        LaunchSource::Uvx {
            package, version, ..
        } => LaunchSource::Uvx {
            package,
            version,
            args: new_args,
        },
        LaunchSource::Docker { image, tag, .. } => LaunchSource::Docker {
            image,
            tag,
            args: new_args,
        },
        LaunchSource::Command { command, .. } => LaunchSource::Command {
            command,
            args: new_args,
        },
        builtin @ LaunchSource::Builtin { .. } => {
            warn!("Ignoring args override for a built-in server");
            builtin
        }
    }
}

fn custom_server(name: &str, entry: &ServerEntry) -> Result<ResolvedServer, CliError> {
    let command = entry.command.clone().ok_or_else(|| {
        CliError::ConfigError(format!(
            "Server '{}' has no command and matches no known server",
            name
        ))
    })?;

    Ok(ResolvedServer {
        package: ServerPackage {
            name: name.to_string(),
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| "User-defined server".to_string()),
            homepage: None,
            licenses: vec![],
            tags: vec![],
            source: LaunchSource::Command {
                command,
                args: entry.args.clone().unwrap_or_default(),
            },
            env: entry.env.clone(),
            required_env: vec![],
        },
        origin: Origin::User,
        enabled: entry.enabled.unwrap_or(true),
    })
}
