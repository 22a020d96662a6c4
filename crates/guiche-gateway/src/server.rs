// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the counter API,
//! the receipt claim route, and the display WebSocket.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use guiche_config::model::GatewayConfig;
use guiche_core::error::GuicheError;
use guiche_queue::TicketService;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::printjobs::PrintJobStore;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Queue operations facade.
    pub service: Arc<TicketService>,
    /// Unclaimed print jobs.
    pub jobs: Arc<PrintJobStore>,
    /// Process start, for the health route's uptime.
    pub started_at: Instant,
    /// Version reported by the health route.
    pub version: &'static str,
}

impl AppState {
    pub fn new(service: Arc<TicketService>, jobs: Arc<PrintJobStore>) -> Self {
        Self {
            service,
            jobs,
            started_at: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Builds the full route tree.
///
/// - `GET /health` (public status)
/// - `POST /v1/tickets/next`, `POST /v1/tickets`, `POST /v1/tickets/range`
/// - `POST /v1/calls/next`, `POST /v1/calls/recall`
/// - `GET /v1/counts`, `POST /v1/admin/reset`, `GET /v1/receipts/{token}`
/// - `GET /ws` (display feed)
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/tickets/next", post(handlers::post_ticket_next))
        .route("/v1/tickets", post(handlers::post_ticket_manual))
        .route("/v1/tickets/range", post(handlers::post_ticket_range))
        .route("/v1/calls/next", post(handlers::post_call_next))
        .route("/v1/calls/recall", post(handlers::post_call_recall))
        .route("/v1/counts", get(handlers::get_counts))
        .route("/v1/admin/reset", post(handlers::post_admin_reset))
        .route("/v1/receipts/{token}", get(handlers::get_receipt))
        .with_state(state.clone());

    let ws_routes = Router::new().route("/ws", get(ws::ws_handler)).with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Binds and serves the gateway until the shutdown future resolves.
pub async fn serve<F>(
    config: &GatewayConfig,
    state: AppState,
    shutdown: F,
) -> Result<(), GuicheError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GuicheError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GuicheError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
