// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `guiche serve` command implementation.
//!
//! Starts the full ticket service: SQLite ledger, queue engine, print-job
//! store, announcement bus, and the HTTP/WebSocket gateway. Supports
//! graceful shutdown via SIGINT/SIGTERM.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use guiche_bus::TicketBus;
use guiche_config::model::GuicheConfig;
use guiche_core::error::GuicheError;
use guiche_core::{Clock, ReceiptSink, StaticDirectory, Station, SystemClock, TicketLedger};
use guiche_gateway::{AppState, PrintJobStore};
use guiche_ledger::SqliteLedger;
use guiche_queue::{QueueSettings, TicketService};
use tracing::{info, warn};

/// Runs the `guiche serve` command.
///
/// Initializes the ledger, wires the queue engine to its collaborators, and
/// runs the gateway until a shutdown signal arrives.
pub async fn run_serve(config: GuicheConfig) -> Result<(), GuicheError> {
    // Initialize tracing subscriber.
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting guiche serve");

    // Resolve counter settings before touching the ledger.
    let settings = QueueSettings::from_config(&config.counters)?;
    info!(
        classes = settings.class_set.classes().len(),
        daily_cap = settings.daily_cap,
        shift_cap = settings.shift_cap,
        max_batch = settings.max_batch,
        "counter settings resolved"
    );

    // Initialize the ticket ledger.
    let ledger: Arc<dyn TicketLedger> = Arc::new(SqliteLedger::new(config.storage.clone()));
    ledger.initialize().await?;
    info!(
        path = config.storage.database_path.as_str(),
        "ticket ledger ready"
    );

    // Station directory from the [stations] table.
    let directory = Arc::new(StaticDirectory::new(station_map(&config)));
    if directory.is_empty() {
        warn!("no stations configured; call operations will be rejected");
    } else {
        info!(stations = directory.len(), "station directory loaded");
    }

    // Announcement bus and print-job store.
    let bus = Arc::new(TicketBus::new(config.gateway.bus_capacity));
    let jobs = Arc::new(PrintJobStore::new(Duration::from_secs(
        config.gateway.receipt_ttl_secs,
    )));
    let sweeper = jobs.spawn_sweeper();

    // Assemble the service.
    let service = Arc::new(TicketService::new(
        Arc::clone(&ledger),
        directory,
        Arc::clone(&jobs) as Arc<dyn ReceiptSink>,
        Arc::clone(&bus),
        Arc::new(SystemClock) as Arc<dyn Clock>,
        settings,
    ));

    if config.gateway.enabled {
        let state = AppState::new(Arc::clone(&service), Arc::clone(&jobs));
        guiche_gateway::serve(&config.gateway, state, shutdown_signal()).await?;
    } else {
        info!("gateway disabled by configuration; running headless");
        shutdown_signal().await;
    }

    sweeper.abort();
    ledger.close().await?;
    info!("guiche serve shutdown complete");
    Ok(())
}

/// Flattens the `[stations]` config table into the directory's map.
fn station_map(config: &GuicheConfig) -> HashMap<String, Station> {
    config
        .stations
        .iter()
        .map(|(operator, station)| {
            (
                operator.clone(),
                Station {
                    room: station.room.clone(),
                    desk: station.desk.clone(),
                },
            )
        })
        .collect()
}

/// Completes when SIGINT (Ctrl+C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT (Ctrl+C), initiating shutdown");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, initiating shutdown");
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `GUICHE_LOG` overrides the configured level with a full filter directive.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("GUICHE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},hyper=warn,tower=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use guiche_config::model::StationConfig;

    use super::*;

    #[test]
    fn station_map_flattens_the_config_table() {
        let mut config = GuicheConfig::default();
        config.stations.insert(
            "maria".to_string(),
            StationConfig { room: "3".to_string(), desk: "1".to_string() },
        );
        config.stations.insert(
            "joao".to_string(),
            StationConfig { room: "3".to_string(), desk: "2".to_string() },
        );

        let map = station_map(&config);
        assert_eq!(map.len(), 2);
        assert_eq!(map["maria"].room, "3");
        assert_eq!(map["joao"].desk, "2");
    }

    #[test]
    fn default_config_has_no_stations() {
        let config = GuicheConfig::default();
        assert!(station_map(&config).is_empty());
    }
}
