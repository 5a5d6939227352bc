// mcpilot CLI - Command Line Interface Entry Point

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcpilot_config::{Config, ConfigLoader, parse_override};
use mcpilot_core::Session;
use mcpilot_core::conversation::print_catalog;
use mcpilot_core::session::{server_launch, session_options};
use mcpilot_mcp_client::{ToolCatalog, ToolServerSession};

/// mcpilot - ask questions answered through a stdio tool server
#[derive(Parser, Debug)]
#[command(name = "mcpilot")]
#[command(version, about, long_about = None)]
struct TopCli {
    #[clap(flatten)]
    config_overrides: CliConfigOverrides,

    #[clap(subcommand)]
    command: Option<Commands>,

    /// Project directory holding .mcpilot/config.toml
    #[arg(short = 'd', long = "dir")]
    dir: Option<PathBuf>,

    /// Tool server command line, replacing server.command and server.args
    #[arg(last = true, value_name = "SERVER_CMD")]
    server_command: Vec<String>,
}

/// CLI configuration overrides
#[derive(Debug, clap::Args)]
struct CliConfigOverrides {
    /// Configuration override in key=value format
    #[arg(short = 'c', long = "config", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

/// Available commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the tool server, list its tools and exit
    Tools,

    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = TopCli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // A stdin read may still be parked on a blocking thread after Ctrl-C.
    runtime.shutdown_timeout(Duration::from_millis(100));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: TopCli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
            print!("{rendered}");
            Ok(())
        }
        Some(Commands::Tools) => list_tools(&config, &interrupt_token()).await,
        None => run_interactive(config).await,
    }
}

fn load_config(cli: &TopCli) -> Result<Config> {
    let overrides = cli
        .config_overrides
        .overrides
        .iter()
        .map(String::as_str)
        .map(parse_override)
        .collect::<Result<Vec<_>>>()?;

    let project_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };

    let mut config = ConfigLoader::new()
        .with_project_dir(project_dir)
        .load_with_cli_overrides(overrides)?;
    apply_server_command(&mut config, &cli.server_command);
    Ok(config)
}

fn apply_server_command(config: &mut Config, server_command: &[String]) {
    if let Some((command, args)) = server_command.split_first() {
        config.server.command = command.clone();
        config.server.args = args.to_vec();
    }
}

/// Cancelled on the first Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C");
            interrupt.cancel();
        }
    });
    cancel
}

/// Print the catalog without touching the reasoning service.
async fn list_tools(config: &Config, cancel: &CancellationToken) -> Result<()> {
    let launch = server_launch(&config.server);
    let server = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        server = ToolServerSession::open(&launch, session_options(&config.server)) => {
            server.with_context(|| format!("failed to start {}", launch.display_command()))?
        }
    };

    let catalog = tokio::select! {
        _ = cancel.cancelled() => None,
        catalog = ToolCatalog::build(&server) => Some(catalog),
    };
    let printed = match &catalog {
        Some(Ok(catalog)) => {
            let mut stdout = tokio::io::stdout();
            print_catalog(&mut stdout, server.server_info(), catalog)
                .await
                .context("failed to write catalog")
        }
        _ => Ok(()),
    };
    server.close().await;

    match catalog {
        Some(catalog) => {
            catalog.context("tool discovery failed")?;
            printed
        }
        None => Ok(()),
    }
}

async fn run_interactive(config: Config) -> Result<()> {
    let cancel = interrupt_token();

    let command = server_launch(&config.server).display_command();
    let session = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        session = Session::start(config) => {
            session.with_context(|| format!("failed to start session with `{command}`"))?
        }
    };

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let result = session.converse(&mut stdin, &mut stdout, &cancel).await;

    session.shutdown().await;
    result.context("terminal I/O failed")
}
