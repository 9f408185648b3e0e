//! Background incident generator.
//!
//! Spawns a task that opens a random incident against a roster of server
//! names on a fixed interval, so the dashboard has live data to show
//! without real infrastructure behind it.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::incident::{NewIncident, Severity};
use crate::storage::incidents::IncidentStore;

/// Roster used when the configuration does not name any servers.
pub const DEFAULT_SERVERS: [&str; 5] = ["web-1", "web-2", "db-1", "cache-1", "api-1"];

/// Default gap between generated incidents.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(8);

/// Handle over the running simulator task.
pub struct SimulatorHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SimulatorHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            error!(error = %e, "simulator task panicked");
        }
    }
}

/// Start the generator loop against `store`.
///
/// The first incident lands one full interval after startup. An empty
/// roster falls back to [`DEFAULT_SERVERS`].
pub fn spawn(store: IncidentStore, servers: Vec<String>, interval: Duration) -> SimulatorHandle {
    let servers = if servers.is_empty() {
        warn!("simulator roster is empty, using default servers");
        DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
    } else {
        servers
    };
    // tokio::time::interval panics on a zero period.
    let interval = if interval.is_zero() {
        warn!("simulator interval must be positive, using default");
        DEFAULT_INTERVAL
    } else {
        interval
    };

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    info!(
        servers = servers.len(),
        interval_secs = interval.as_secs_f64(),
        "starting incident simulator"
    );

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick of an interval completes immediately; consume it
        // so the first incident waits a full interval.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    info!("incident simulator stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let incident = {
                        let mut rng = rand::thread_rng();
                        synthesize(&servers, &mut rng)
                    };
                    match store.create(&incident) {
                        Ok(created) => info!(
                            id = created.id,
                            server = %created.server_name,
                            severity = %created.severity,
                            "simulator created incident"
                        ),
                        // One failed insert should not take the loop down.
                        Err(e) => error!(error = %e, "simulator failed to create incident"),
                    }
                }
            }
        }
    });

    SimulatorHandle { shutdown_tx, join }
}

/// Build one random incident against the roster.
pub fn synthesize<R: Rng + ?Sized>(servers: &[String], rng: &mut R) -> NewIncident {
    let server_name = servers
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    let severity = severity_for_roll(rng.gen::<f64>());

    NewIncident {
        description: Some(format!(
            "Auto-generated incident on {server_name} with severity {severity}."
        )),
        change_suggested: severity.suggests_change(),
        server_name,
        severity,
    }
}

/// Map a uniform roll in `[0, 1)` onto a severity tier.
///
/// Weighted so routine noise dominates: half the rolls land on Low and
/// only one in twenty reaches Critical.
fn severity_for_roll(roll: f64) -> Severity {
    if roll < 0.5 {
        Severity::Low
    } else if roll < 0.8 {
        Severity::Medium
    } else if roll < 0.95 {
        Severity::High
    } else {
        Severity::Critical
    }
}
