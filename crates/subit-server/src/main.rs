//! `SubIt` server entry point.
//!
//! Resolves configuration, opens the billing store, loads Clerk keys, then
//! starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use subit_server::app::{build_identity, build_router, build_store};
use subit_server::config::{AuthMode, ServerConfig};
use subit_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(environment = ?config.environment, store = ?config.store, "SubIt starting");

    match &config.auth {
        AuthMode::Enforced(clerk) => {
            info!(sign_in_url = %clerk.sign_in_url, "Clerk sessions enforced on protected routes");
        }
        AuthMode::Disabled { reason } if config.environment.is_production() => {
            error!(reason = %reason, "authentication DISABLED in production: every route is public");
        }
        AuthMode::Disabled { reason } => {
            warn!(reason = %reason, "authentication disabled: every route is public");
        }
    }

    let store = build_store(&config.store).await?;
    let identity = build_identity(&config.auth).await?;

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, identity, store).context("invalid route configuration")?);

    if let Some(canonical) = state.gate.canonical() {
        info!(canonical = %canonical.origin(), legacy_host = %state.config.legacy_host, "legacy host redirect active");
    }

    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;

    info!(addr = %bind_addr, "SubIt server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("SubIt server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
