//! Implementations of the cli-mcp subcommands

use anyhow::{bail, Context, Result};
use cli_mcp::config::{ConfigLoader, ResolvedServer, ServerEntry};
use cli_mcp::export::export_client_config;
use cli_mcp::resolver::{diagnose, install_hint};
use cli_mcp::client::parse_tool_arguments;
use cli_mcp::{servers, CliError, McpClient, McpServer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

fn self_exe() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|e| {
        warn!("Cannot determine own executable path: {}", e);
        PathBuf::from("cli-mcp")
    })
}

fn status(server: &ResolvedServer) -> &'static str {
    if server.enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn print_table(servers: &[ResolvedServer]) {
    if servers.is_empty() {
        println!("No servers found.");
        return;
    }

    let name_width = servers
        .iter()
        .map(|s| s.name().len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<name_width$}  {:<8}  {:<8}  {:<8}  DESCRIPTION",
        "NAME", "KIND", "ORIGIN", "STATUS"
    );
    for server in servers {
        println!(
            "{:<name_width$}  {:<8}  {:<8}  {:<8}  {}",
            server.name(),
            server.package.source.kind(),
            server.origin.to_string(),
            status(server),
            server.package.description
        );
    }
}

/// List registered servers
pub fn list_servers(loader: &ConfigLoader, all: bool, json: bool) -> Result<()> {
    let servers = loader.list_servers(all);

    if json {
        println!("{}", serde_json::to_string_pretty(&servers)?);
    } else {
        print_table(&servers);
    }

    Ok(())
}

/// Show one server in detail
pub fn show_server(loader: &ConfigLoader, name: &str) -> Result<()> {
    let server = loader.resolve(name)?;
    let pkg = &server.package;
    let spec = pkg.launch_spec(&self_exe());

    println!("Name:        {}", pkg.name);
    println!("Description: {}", pkg.description);
    println!("Origin:      {}", server.origin);
    println!("Status:      {}", status(&server));
    println!("Kind:        {}", pkg.source.kind());
    println!("Command:     {}", spec.command_line());
    if let Some(homepage) = &pkg.homepage {
        println!("Homepage:    {}", homepage);
    }
    if !pkg.licenses.is_empty() {
        println!("Licenses:    {}", pkg.licenses.join(", "));
    }
    if !pkg.tags.is_empty() {
        println!("Tags:        {}", pkg.tags.join(", "));
    }
    if !spec.env.is_empty() {
        let keys: Vec<&str> = spec.env.keys().map(String::as_str).collect();
        println!("Env:         {}", keys.join(", "));
    }
    if !pkg.required_env.is_empty() {
        println!("Requires:    {}", pkg.required_env.join(", "));
    }

    Ok(())
}

/// Search names, descriptions and tags
pub fn search_servers(loader: &ConfigLoader, query: &str) -> Result<()> {
    let hits = loader.search(query);
    if hits.is_empty() {
        println!("No servers match '{}'.", query);
        return Ok(());
    }

    print_table(&hits);
    Ok(())
}

fn parse_env_pair(pair: &str) -> Result<(String, String), CliError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidArgument(format!(
            "--env value '{}', expected KEY=VALUE",
            pair
        ))),
    }
}

/// Add or replace a user-defined server
pub fn add_server(
    loader: &ConfigLoader,
    name: &str,
    command: String,
    args: Vec<String>,
    env: Vec<String>,
    description: Option<String>,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Server name must not be empty");
    }
    if loader.is_builtin(name) {
        bail!("'{}' is a built-in server and cannot be replaced", name);
    }

    let env: BTreeMap<String, String> = env
        .iter()
        .map(|pair| parse_env_pair(pair))
        .collect::<Result<_, CliError>>()?;

    let mut config = loader.user_config().clone();
    let replaced = config.servers.contains_key(name);
    config.upsert_server(
        name,
        ServerEntry {
            enabled: Some(true),
            description,
            command: Some(command),
            args: (!args.is_empty()).then_some(args),
            env,
        },
    );

    let path = loader.user_config_path();
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let verb = if replaced {
        "Updated"
    } else if loader.is_known(name) {
        "Overrode"
    } else {
        "Added"
    };
    info!("{} server {} in {}", verb, name, path.display());
    println!("{} server '{}' in {}", verb, name, path.display());
    Ok(())
}

/// Remove a user entry (custom server or override)
pub fn remove_server(loader: &ConfigLoader, name: &str) -> Result<()> {
    let mut config = loader.user_config().clone();

    if !config.remove_server(name) {
        if loader.is_known(name) {
            bail!(
                "'{}' has no user configuration to remove; use `cli-mcp disable {}` instead",
                name,
                name
            );
        }
        bail!("No user-defined server named '{}'", name);
    }

    let path = loader.user_config_path();
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Removed server '{}' from {}", name, path.display());
    Ok(())
}

/// Enable or disable a server
pub fn set_enabled(loader: &ConfigLoader, name: &str, enabled: bool) -> Result<()> {
    if !loader.is_known(name) && !loader.user_config().servers.contains_key(name) {
        bail!("Unknown server: {}", name);
    }

    let mut config = loader.user_config().clone();
    config.set_enabled(name, enabled);

    let path = loader.user_config_path();
    config
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} server '{}'",
        if enabled { "Enabled" } else { "Disabled" },
        name
    );
    Ok(())
}

/// Host a built-in server on stdio
pub async fn serve(name: &str) -> Result<()> {
    let Some(provider) = servers::builtin(name) else {
        bail!(
            "'{}' is not a built-in server (available: {})",
            name,
            servers::BUILTIN_SERVERS.join(", ")
        );
    };

    McpServer::new(provider).run().await
}

async fn connect(loader: &ConfigLoader, name: &str, timeout: Option<u64>) -> Result<McpClient> {
    let server = loader.resolve(name)?;
    if !server.enabled {
        warn!("Server {} is disabled, connecting anyway", name);
    }

    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| loader.request_timeout());
    let spec = server.package.launch_spec(&self_exe());

    McpClient::spawn(name, &spec, timeout).await.with_context(|| {
        format!(
            "Failed to start '{}'. {}",
            name,
            install_hint(&server.package.source)
        )
    })
}

/// Start a server, run the handshake and list its tools
pub async fn check_server(loader: &ConfigLoader, name: &str, timeout: Option<u64>) -> Result<()> {
    let client = connect(loader, name, timeout).await?;

    if let Some(info) = client.server_info() {
        println!("Server:   {} {}", info.name, info.version);
    }
    if let Some(instructions) = client.instructions() {
        println!("About:    {}", instructions);
    }

    let tools = client.list_tools().await?;
    println!("Tools:    {}", tools.len());
    for tool in &tools {
        let summary = tool.description.lines().next().unwrap_or_default();
        println!("  - {}: {}", tool.name, summary);
    }

    client.shutdown().await?;
    println!("OK");
    Ok(())
}

/// The tool outcome wins over a failed shutdown, which is only logged
fn keep_call_result<T>(
    name: &str,
    result: Result<T, CliError>,
    shutdown: Result<(), CliError>,
) -> Result<T, CliError> {
    if let Err(e) = shutdown {
        warn!("Failed to shut down {} cleanly: {}", name, e);
    }
    result
}

/// Call a single tool and print its text output
pub async fn call_tool(
    loader: &ConfigLoader,
    name: &str,
    tool: &str,
    args: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let arguments = parse_tool_arguments(args.as_deref()).context("Invalid --args")?;

    let client = connect(loader, name, timeout).await?;
    let result = client.call_tool(tool, arguments).await;
    let result = keep_call_result(name, result, client.shutdown().await)?;
    println!("{}", result.text_content());

    if result.is_error() {
        bail!("Tool '{}' reported an error", tool);
    }
    Ok(())
}

/// Print a client config for the enabled (or all) servers
pub fn export(loader: &ConfigLoader, all: bool) -> Result<()> {
    let servers = loader.list_servers(all);
    let value = export_client_config(&servers, &self_exe());
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Check launchers and required environment of enabled servers
pub fn doctor(loader: &ConfigLoader) -> Result<()> {
    let exe = self_exe();
    let servers = loader.list_servers(false);
    let mut ready = 0;

    for server in &servers {
        let diagnosis = diagnose(server, &exe);

        if diagnosis.is_healthy() {
            ready += 1;
            println!("[ok]      {}", diagnosis.name);
            continue;
        }

        println!("[problem] {}", diagnosis.name);
        if diagnosis.found.is_none() {
            println!("          '{}' not found on PATH", diagnosis.program);
            println!("          {}", install_hint(&server.package.source));
        }
        for key in &diagnosis.missing_env {
            println!("          environment variable {} is not set", key);
        }
    }

    println!();
    println!("{} of {} enabled servers ready", ready, servers.len());
    println!("Config: {}", loader.user_config_path().display());
    Ok(())
}

pub fn config_path(loader: &ConfigLoader) -> Result<()> {
    println!("{}", loader.user_config_path().display());
    Ok(())
}

pub fn config_show(loader: &ConfigLoader) -> Result<()> {
    print!("{}", loader.user_config().to_toml()?);
    Ok(())
}
