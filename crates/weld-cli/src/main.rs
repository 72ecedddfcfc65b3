//! Weld Connect CLI
//!
//! Command-line interface and terminal wizard for setting up ELT syncs with
//! the Weld Connect API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use weld_core::{ApiClient, Config};

mod commands;
mod editor;
mod output;
mod tui;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "weld-connect")]
#[command(about = "Weld Connect - set up and monitor ELT syncs from the terminal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a different config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API key for this run (overrides config and WELD_CONNECT_API_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the setup wizard (default)
    Tui,
    /// Check that the API key is accepted
    Status,
    /// List available integrations
    Integrations,
    /// Manage connection bridges
    Bridge {
        #[command(subcommand)]
        command: BridgeCommands,
    },
    /// Show the ELT settings schema for a connection
    Settings {
        /// Connection ID
        connection_id: String,
    },
    /// Manage ELT syncs
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Trigger work on a single stream
    Stream {
        #[command(subcommand)]
        command: StreamCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Print the destination schema name derived from text
    SchemaName {
        /// Free text, e.g. an integration id
        text: String,
    },
}

#[derive(Subcommand)]
enum BridgeCommands {
    /// Create a connection bridge and print its authorize URL
    Create {
        /// Integration ID (see `weld-connect integrations`)
        #[arg(short, long)]
        integration: String,
        /// Connection label (defaults to connection_label from config)
        #[arg(short, long)]
        label: Option<String>,
        /// Redirect URI (defaults to the local callback listener)
        #[arg(long)]
        redirect_uri: Option<String>,
        /// Open the authorize URL and wait for the connection id
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Create an ELT sync for a connection
    Create {
        /// Connection ID (defaults to connection_id from config)
        #[arg(short, long)]
        connection: Option<String>,
        /// Destination schema name (normalized before sending)
        #[arg(short, long)]
        schema: String,
        /// Sync interval as a cron expression
        #[arg(short, long, default_value = weld_core::sync_form::DEFAULT_SYNC_INTERVAL)]
        interval: String,
        /// Start date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        start_date: Option<String>,
        /// ELT settings as a JSON object
        #[arg(long, conflicts_with = "edit")]
        settings: Option<String>,
        /// Write ELT settings in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },
    /// Show a sync
    Show {
        /// ELT sync ID
        id: String,
    },
    /// Show per-stream status of a sync
    Status {
        /// ELT sync ID
        id: String,
    },
    /// Enable a sync
    Enable {
        /// ELT sync ID
        id: String,
    },
    /// Disable a sync
    Disable {
        /// ELT sync ID
        id: String,
    },
    /// Start a sync run now
    Start {
        /// ELT sync ID
        id: String,
    },
    /// Stop a running sync
    Stop {
        /// ELT sync ID
        id: String,
    },
    /// List streams available for a sync
    Streams {
        /// ELT sync ID
        id: String,
    },
    /// Add streams to a sync
    AddStreams {
        /// ELT sync ID
        id: String,
        /// Stream names to add with default settings
        #[arg(required_unless_present_any = ["config", "edit"])]
        names: Vec<String>,
        /// Raw stream configuration as a JSON array
        #[arg(long, conflicts_with_all = ["names", "edit"])]
        config: Option<String>,
        /// Write the stream configuration in $EDITOR
        #[arg(short, long, conflicts_with = "names")]
        edit: bool,
    },
    /// Poll sync status until the polling window closes
    Watch {
        /// ELT sync ID
        id: String,
        /// Polling window in seconds
        #[arg(long, default_value_t = weld_core::poller::INITIAL_POLL_WINDOW.as_secs())]
        window: u64,
    },
}

#[derive(Subcommand)]
enum StreamCommands {
    /// Request a run of one stream
    Run {
        /// Stream ID
        id: String,
    },
    /// Request a full refresh of one stream
    FullRefresh {
        /// Stream ID
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (base_url, api_key, connection_id, callback_port, connection_label, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Commands that need neither an API key nor logging
    match &cli.command {
        Some(Commands::Config { command }) => {
            return handle_config_command(command.clone(), config_path, &output);
        }
        Some(Commands::SchemaName { text }) => {
            return commands::schema::name(text, &output);
        }
        _ => {}
    }

    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    if let Some(key) = cli.api_key {
        config.api_key = Some(key);
    }

    if matches!(&cli.command, Some(Commands::Tui) | None) {
        return tui::run(config).await;
    }

    init_cli_logging();

    let client = ApiClient::from_config(&config)?;

    match cli.command {
        Some(Commands::Status) => commands::status::show(&client, &config, &output).await,
        Some(Commands::Integrations) => commands::integrations::list(&client, &output).await,
        Some(Commands::Bridge { command }) => {
            handle_bridge_command(command, &client, &config, &output).await
        }
        Some(Commands::Settings { connection_id }) => {
            commands::sync::settings(&client, &connection_id, &output).await
        }
        Some(Commands::Sync { command }) => {
            handle_sync_command(command, &client, &config, &output).await
        }
        Some(Commands::Stream { command }) => handle_stream_command(command, &client, &output).await,
        // Handled above
        Some(Commands::Tui)
        | Some(Commands::Config { .. })
        | Some(Commands::SchemaName { .. })
        | None => Ok(()),
    }
}

async fn handle_bridge_command(
    command: BridgeCommands,
    client: &ApiClient,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        BridgeCommands::Create {
            integration,
            label,
            redirect_uri,
            wait,
        } => {
            commands::bridge::create(
                client,
                config,
                commands::bridge::BridgeOptions {
                    integration,
                    label,
                    redirect_uri,
                    wait,
                },
                output,
            )
            .await
        }
    }
}

async fn handle_sync_command(
    command: SyncCommands,
    client: &ApiClient,
    config: &Config,
    output: &Output,
) -> Result<()> {
    use commands::sync;

    match command {
        SyncCommands::Create {
            connection,
            schema,
            interval,
            start_date,
            settings,
            edit,
        } => {
            let connection = connection
                .or_else(|| config.connection_id.clone())
                .context("No connection given. Pass --connection or set connection_id.")?;
            sync::create(
                client,
                sync::CreateOptions {
                    connection_id: connection,
                    schema,
                    interval,
                    start_date,
                    settings,
                    edit,
                },
                output,
            )
            .await
        }
        SyncCommands::Show { id } => sync::show(client, &id, output).await,
        SyncCommands::Status { id } => sync::status(client, &id, output).await,
        SyncCommands::Enable { id } => sync::enable(client, &id, output).await,
        SyncCommands::Disable { id } => sync::disable(client, &id, output).await,
        SyncCommands::Start { id } => sync::start(client, &id, output).await,
        SyncCommands::Stop { id } => sync::stop(client, &id, output).await,
        SyncCommands::Streams { id } => sync::streams(client, &id, output).await,
        SyncCommands::AddStreams {
            id,
            names,
            config,
            edit,
        } => sync::add_streams(client, &id, names, config, edit, output).await,
        SyncCommands::Watch { id, window } => {
            sync::watch(client, &id, std::time::Duration::from_secs(window), output).await
        }
    }
}

async fn handle_stream_command(
    command: StreamCommands,
    client: &ApiClient,
    output: &Output,
) -> Result<()> {
    match command {
        StreamCommands::Run { id } => commands::stream::run(client, &id, output).await,
        StreamCommands::FullRefresh { id } => {
            commands::stream::full_refresh(client, &id, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging for CLI commands
///
/// Only initializes if WELD_LOG is set. Logs go to stderr so stdout stays
/// machine-readable under --json.
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("WELD_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!("weld_core={},weld_connect={}", log_level, log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
