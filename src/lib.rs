//! Rackwatch -- simulated data-centre incident dashboard backend.
//!
//! This crate provides the incident store, dashboard statistics, the
//! background incident simulator, and the HTTP API that serves them.

pub mod api;
pub mod config;
pub mod incident;
pub mod simulator;
pub mod stats;
pub mod storage;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::api::state::AppState;
use crate::config::RackwatchConfig;
use crate::storage::incidents::IncidentStore;

/// Start the rackwatch server: HTTP API plus the incident simulator.
///
/// Runs until Ctrl-C (or SIGTERM on unix), then drains in-flight
/// requests and stops the simulator.
pub async fn serve(cfg: &RackwatchConfig) -> Result<()> {
    info!(db_path = %cfg.database.path, "Initializing database");
    let pool = storage::open_pool(&cfg.database.path)?;
    let store = IncidentStore::new(pool);

    let sim = if cfg.simulator.enabled {
        Some(simulator::spawn(
            store.clone(),
            cfg.simulator.servers.clone(),
            Duration::from_secs(cfg.simulator.interval_secs),
        ))
    } else {
        info!("incident simulator disabled");
        None
    };

    let app = api::router(AppState { store });

    let addr: SocketAddr = cfg
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", cfg.server.bind))?;

    info!(%addr, "Rackwatch listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sim) = sim {
        sim.stop().await;
    }

    Ok(())
}

/// Resolves when the process receives Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining");
}
