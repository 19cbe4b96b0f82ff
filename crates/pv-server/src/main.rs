//! PV sponsorship server
//!
//! Serves element reservations and user management over a JSON API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pv_core::config::load_config;
use pv_core::tracing_init::{default_filter, init_tracing};
use pv_server::api::{AppState, build_router};
use pv_server::storage::Store;

#[derive(Parser, Debug)]
#[command(name = "pv-server")]
#[command(
    version,
    about = "PV sponsorship server - element reservations and user management"
)]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, env = "PV_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    config.validate()?;

    init_tracing(
        &default_filter(&config.log_level, &["pv_server", "pv_core", "tower_http"]),
        args.log_json || config.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting pv-server"
    );

    let store = Store::open(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
    store.ping().await.context("Database does not answer")?;

    let state = AppState::new(store, &config)
        .context("Invalid element catalogue")?;

    // Evict expired inventory snapshots in the background.
    let reservations = state.reservations.clone();
    let purge_interval = config.cache_purge_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            reservations.purge_cache().await;
        }
    });

    let app = build_router(state, &config.server.path_prefix);
    let listener = tokio::net::TcpListener::bind(config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!(addr = %config.server.addr, prefix = %config.server.path_prefix, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
