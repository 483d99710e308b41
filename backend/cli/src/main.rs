mod app;
mod commands;
mod terminal_output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use dprscope_config::{load_and_prepare, resolve_config_path, validate, DprScopeConfig};
use dprscope_logging::init_logger;

#[derive(Parser)]
#[command(name = "dprscope")]
#[command(about = "DPRScope: automated review of Detailed Project Reports")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $DPR_CONFIG, then ~/.dprscope/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to
        #[arg(long)]
        bind: Option<String>,
    },
    /// Check whether a local server is up
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Review a single DPR file without starting the server
    Review {
        file: PathBuf,
    },
    /// List stored reviews, newest first
    List {
        /// Only show reviews at this risk level (Low, Medium, High)
        #[arg(long)]
        risk_level: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Serve { port, bind } => {
            let mut config = load(&config_path).await?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            run_server(config).await?;
        }
        Commands::Status { port } => {
            let config = load(&config_path).await?;
            commands::status::run(port.unwrap_or(config.server.port)).await?;
        }
        Commands::Review { file } => {
            let config = load(&config_path).await?;
            commands::review::run(&config, &file).await?;
        }
        Commands::List { risk_level, limit } => {
            let config = load(&config_path).await?;
            commands::list::run(&config, risk_level.as_deref(), limit).await?;
        }
        Commands::Config { action } => {
            commands::config::run(&action, &config_path).await?;
        }
    }

    Ok(())
}

/// Load the config and start logging as it describes.
async fn load(path: &Path) -> Result<DprScopeConfig> {
    let config = load_and_prepare(path)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    init_logger(&app::log_options(&config.logging));
    // Warnings raised while loading predate the subscriber.
    for warning in validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    Ok(config)
}

async fn run_server(config: DprScopeConfig) -> Result<()> {
    info!(
        port = config.server.port,
        bind = %config.server.bind_address,
        db = %config.storage.database_url,
        predictor = %config.predictor.base_url,
        "Starting DPRScope"
    );

    let state = Arc::new(app::build_state(&config)?);
    let router = dprscope_gateway::build_router(state, &app::router_options(&config))?;
    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.addr()))?;

    dprscope_gateway::serve(addr, router).await
}
