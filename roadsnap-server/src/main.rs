mod api;
mod config;
mod state;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(version, about = "Road graph builder and routing server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the routing API
    Serve {
        /// Rebuild from the geometry source before accepting requests
        #[arg(long)]
        rebuild: bool,
    },
    /// Rebuild the persisted graph from the geometry source
    Build,
    /// Print node and edge counts of the persisted graph
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let state = AppState::from_config(&config)?;

    match cli.command {
        Command::Serve { rebuild } => serve(state, &config, rebuild).await,
        Command::Build => {
            let stats = tokio::task::spawn_blocking(move || state.rebuild()).await??;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Stats => {
            let stats = state.stored_stats()?;
            println!("nodes: {}\nedges: {}", stats.nodes, stats.edges);
            Ok(())
        }
    }
}

async fn serve(state: AppState, config: &Config, rebuild: bool) -> Result<(), Box<dyn Error>> {
    if rebuild {
        let builder = state.clone();
        let stats = tokio::task::spawn_blocking(move || builder.rebuild()).await??;
        info!(nodes = stats.nodes(), edges = stats.edges, "Graph rebuilt at startup");
    } else {
        match state.load_persisted() {
            Ok(true) => {}
            Ok(false) => warn!(
                "No persisted graph at {}; routing is unavailable until POST /api/graph/rebuild",
                config.data.store_path.display()
            ),
            Err(e) => warn!("Persisted graph could not be loaded: {e}"),
        }
    }

    let app = api::router(state, &config.server);
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
