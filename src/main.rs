mod commands;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use cli_mcp::{version, ConfigLoader};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Manage, host and probe Model Context Protocol servers
#[derive(Parser, Debug)]
#[command(name = "cli-mcp")]
#[command(author, about, long_about = None, disable_version_flag = true)]
struct Args {
    /// Print version information
    #[arg(short = 'V', long)]
    version: bool,

    /// User config file to read and edit
    ///
    /// Defaults to the first existing of ./.cli-mcp.toml, $CLI_MCP_CONFIG
    /// and the platform config directory (cli-mcp/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Log to file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered servers
    List {
        /// Include disabled servers
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show details of a server
    Show { name: String },

    /// Search servers by name, description or tag
    Search { query: String },

    /// Add a server to the user config
    Add {
        name: String,

        /// Program that starts the server
        #[arg(long)]
        command: String,

        /// Argument passed to the program (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Environment variable as KEY=VALUE (repeatable)
        #[arg(long)]
        env: Vec<String>,

        /// Short description shown in listings
        #[arg(long)]
        description: Option<String>,
    },

    /// Remove a server from the user config
    Remove { name: String },

    /// Enable a server
    Enable { name: String },

    /// Disable a server
    Disable { name: String },

    /// Run a built-in server on stdio
    Serve { name: String },

    /// Start a server, perform the MCP handshake and list its tools
    Check {
        name: String,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Call a tool on a server
    Call {
        name: String,
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print an mcpServers client config for the enabled servers
    Export {
        /// Include disabled servers
        #[arg(short, long)]
        all: bool,
    },

    /// Check launchers and environment of enabled servers
    Doctor,

    /// Inspect the user config
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the path of the user config file
    Path,

    /// Print the user config
    Show,
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // stdout carries protocol traffic and command output
    if let Some(log_path) = log_file {
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        subscriber.with_ansi(false).with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("cli-mcp version: {}", version());
        return Ok(());
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        std::process::exit(2);
    };

    // Load before logging so the config can choose the level
    let loader = ConfigLoader::load(args.config.as_deref());

    let log_level = args
        .log_level
        .or_else(|| {
            loader
                .as_ref()
                .ok()
                .and_then(|l| l.user_config().log_level().map(str::to_string))
        })
        .unwrap_or_else(|| "warn".to_string());
    setup_logging(&log_level, args.log_file)?;

    debug!("Starting cli-mcp v{}", version());

    // Serving a built-in server never depends on the user config
    if let Commands::Serve { name } = &command {
        return commands::serve(name).await;
    }

    let loader = loader.context("Failed to load configuration")?;

    match command {
        Commands::List { all, json } => commands::list_servers(&loader, all, json),
        Commands::Show { name } => commands::show_server(&loader, &name),
        Commands::Search { query } => commands::search_servers(&loader, &query),
        Commands::Add {
            name,
            command,
            args,
            env,
            description,
        } => commands::add_server(&loader, &name, command, args, env, description),
        Commands::Remove { name } => commands::remove_server(&loader, &name),
        Commands::Enable { name } => commands::set_enabled(&loader, &name, true),
        Commands::Disable { name } => commands::set_enabled(&loader, &name, false),
        Commands::Serve { name } => commands::serve(&name).await,
        Commands::Check { name, timeout } => commands::check_server(&loader, &name, timeout).await,
        Commands::Call {
            name,
            tool,
            args,
            timeout,
        } => commands::call_tool(&loader, &name, &tool, args, timeout).await,
        Commands::Export { all } => commands::export(&loader, all),
        Commands::Doctor => commands::doctor(&loader),
        Commands::Config { command } => match command {
            ConfigCommand::Path => commands::config_path(&loader),
            ConfigCommand::Show => commands::config_show(&loader),
        },
    }
}
