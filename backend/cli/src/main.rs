mod config_cmd;
mod context;
mod key_cmd;
mod lookup_cmd;
mod present;
mod scan_cmd;
mod session_cmd;
mod terminal_output;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medlens_config::{apply_all_defaults, config_dir, config_file_path, load_and_prepare, load_config};
use medlens_gateway::{start_server, GatewayState};
use tracing::info;

use config_cmd::ConfigCommands;
use context::{resolve_in, AppContext};
use key_cmd::KeyCommands;
use lookup_cmd::LookupArgs;
use scan_cmd::ScanArgs;
use session_cmd::SessionCommands;

#[derive(Parser)]
#[command(name = "medlens")]
#[command(about = "MedLens: identify medicine packages from photos")]
#[command(version)]
struct Cli {
    /// Directory holding config.yaml and the local store
    #[arg(long, global = true, env = "MEDLENS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Photograph a package step by step and identify it
    Scan(ScanArgs),
    /// Manage the model provider API key
    Key {
        #[command(subcommand)]
        cmd: KeyCommands,
    },
    /// Inspect or discard the unfinished scan
    Session {
        #[command(subcommand)]
        cmd: SessionCommands,
    },
    /// Look up a drug label by code or name
    Lookup(LookupArgs),
    /// Start the lookup proxy for browser front-ends
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long, env = "MEDLENS_PORT")]
        port: Option<u16>,
    },
    /// Show or check configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dir = cli.config_dir.clone().unwrap_or_else(config_dir);
    let config_path = config_file_path(&dir);

    // Config commands must work on a file that does not validate.
    if let Commands::Config { cmd } = cli.command {
        let config = apply_all_defaults(load_config(&config_path).await?);
        return config_cmd::run(&config, &config_path, cmd).await;
    }

    let config = load_and_prepare(&config_path).await?;
    let log_dir = config.log_dir().map(|d| resolve_in(&dir, &d));
    medlens_logging::init_logger(log_dir.as_deref(), &config.log_level());

    let ctx = AppContext::new(config, dir, config_path)?;
    match cli.command {
        Commands::Scan(args) => scan_cmd::run(&ctx, args).await?,
        Commands::Key { cmd } => key_cmd::run(&ctx, cmd).await?,
        Commands::Session { cmd } => session_cmd::run(&ctx, cmd).await?,
        Commands::Lookup(args) => lookup_cmd::run(&ctx, args).await?,
        Commands::Serve { port } => run_server(&ctx, port).await?,
        Commands::Config { .. } => unreachable!("handled before the store is opened"),
    }
    Ok(())
}

async fn run_server(ctx: &AppContext, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or_else(|| ctx.config.gateway_port());
    let addr: SocketAddr = format!("{}:{port}", ctx.config.gateway_bind())
        .parse()
        .context("Invalid gateway bind address")?;
    info!(%addr, lookup = %ctx.config.lookup_base_url(), "Starting MedLens lookup proxy");
    let state = GatewayState::new(Arc::new(ctx.lookup_client()?));
    start_server(addr, state).await
}
