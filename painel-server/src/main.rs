//! painel-server - assessment results dashboard service
//!
//! Loads the TOML configuration, starts the HTTP API and proxies result
//! queries to the upstream analytics gateway.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use painel_common::config::AppConfig;
use painel_server::services::HttpTransport;
use painel_server::api::buildinfo::BuildInfo;
use painel_server::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "painel-server")]
#[command(about = "Assessment results dashboard service")]
struct Args {
    /// Path to painel.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the config file
    #[arg(short, long, env = "PAINEL_PORT")]
    port: Option<u16>,

    /// Address to bind, overrides the config file
    #[arg(short, long, env = "PAINEL_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first so the file's log level can seed the filter
    let (mut config, report) =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "painel_server={lvl},tower_http={lvl}",
                    lvl = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting painel-server {}", BuildInfo::CURRENT);
    info!("Configuration: {}", report.path.display());
    for var in &report.env_overrides {
        info!("{} overrides the configuration file", var);
    }
    for code in config.credentials.conflicting_codes() {
        warn!(
            code = %code,
            "Entity code listed as both municipal user and school; school password wins"
        );
    }

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    info!(
        "Upstream API: {} (timeout {:?}, cache TTL {:?})",
        config.api.url, config.api.timeout, config.api.cache_ttl
    );
    info!(
        "Credentials: {} users, {} schools, master password {}",
        config.credentials.user_count(),
        config.credentials.school_count(),
        if config.credentials.has_master_password() { "set" } else { "unset" }
    );

    let transport = HttpTransport::new(config.api.url.clone(), config.api.timeout)
        .context("Failed to build HTTP client")?;

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.port))?;

    info!("Session idle timeout: {:?}", config.session.idle_timeout);

    let state = AppState::new(config, Arc::new(transport));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("painel-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
