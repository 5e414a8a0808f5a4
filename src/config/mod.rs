//! Configuration system for cli-mcp
//!
//! Provides a 3-tier configuration hierarchy:
//! 1. User config (highest priority)
//! 2. Embedded server registry (medium priority)
//! 3. Built-in servers (lowest priority)

mod defaults;
mod loader;
mod registry;
mod user_config;

pub use defaults::get_default_configs;
pub use loader::{global_config_path, ConfigLoader, CONFIG_ENV_VAR, PROJECT_CONFIG_FILE};
pub use registry::{LaunchSource, LaunchSpec, Origin, ResolvedServer, ServerPackage};
pub use user_config::{ServerEntry, Settings, UserConfig};
