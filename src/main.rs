//! oddsbot — cross-venue arbitrage monitor.
//!
//! Wires the pieces together: config from the environment, alias table from
//! disk, one engine instance shared by reference with the dashboard API and
//! (in a full deployment) the venue feed adapters. On ctrl-c the session
//! summary is logged before exit.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddsbot_backend::{api, AliasTable, Config, Engine, NameMatcher};

#[derive(Debug, Parser)]
#[command(name = "oddsbot", about = "Cross-venue odds arbitrage monitor")]
struct Args {
    /// Dashboard API port (overrides ODDSBOT_PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Alias table path (overrides ODDSBOT_ALIAS_FILE).
    #[arg(long)]
    aliases: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddsbot_backend=info,oddsbot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env().context("loading configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(aliases) = args.aliases {
        config.alias_file = aliases;
    }

    let aliases = Arc::new(AliasTable::load(&config.alias_file));
    if aliases.is_empty() {
        warn!("running with an empty alias table, fuzzy-only name matching");
    }
    let matcher = NameMatcher::with_threshold(aliases, config.similarity_threshold);

    let engine = Arc::new(Engine::new(&config, matcher));

    // Venue feed adapters are external processes/tasks in this deployment;
    // they push offers through Engine::add_offer and must guarantee stable
    // per-platform ids, wall-clock ingestion timestamps and decimal odds.

    let app = api::router(engine.clone());
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding dashboard API on {addr}"))?;
    info!(%addr, "dashboard API listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!(error = %e, "dashboard API stopped");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    warn!("shutdown signal received");
    engine.log_session_summary();
    server.abort();

    Ok(())
}
