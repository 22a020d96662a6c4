// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the counter REST API.
//!
//! Ticket bodies, call events, and counts all serialize with the two-letter
//! class codes; errors carry a machine `code` plus a human `message`.
//! Storage and internal failures are logged in full and redacted to their
//! failure class on the wire.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use guiche_core::error::GuicheError;
use guiche_core::types::{
    CallEvent, HealthStatus, ManualOutcome, OperatorId, PendingCount, QueueClass, ReceiptToken,
    Ticket,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::AppState;

/// Request body for POST /v1/tickets/next.
#[derive(Debug, Deserialize)]
pub struct IssueNextRequest {
    /// Two-letter queue-class code.
    pub class: String,
}

/// Request body for POST /v1/tickets.
#[derive(Debug, Deserialize)]
pub struct IssueManualRequest {
    pub class: String,
    /// Exact ticket number to record.
    pub number: i64,
}

/// Request body for POST /v1/tickets/range.
#[derive(Debug, Deserialize)]
pub struct IssueRangeRequest {
    pub class: String,
    /// Inclusive bound; may be larger than `end`.
    pub start: i64,
    /// Inclusive bound; may be smaller than `start`.
    pub end: i64,
}

/// Request body for POST /v1/calls/next.
#[derive(Debug, Deserialize)]
pub struct CallNextRequest {
    pub class: String,
    pub operator_id: String,
}

/// Request body for POST /v1/calls/recall.
#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub operator_id: String,
}

/// Wire form of a stored ticket.
#[derive(Debug, Serialize)]
pub struct TicketBody {
    pub class: String,
    pub number: u32,
    pub issued_on: String,
    pub shift: String,
}

impl From<&Ticket> for TicketBody {
    fn from(ticket: &Ticket) -> Self {
        Self {
            class: ticket.class.code(),
            number: ticket.number,
            issued_on: ticket.issued_on.clone(),
            shift: ticket.shift.as_str().to_string(),
        }
    }
}

/// Response body for POST /v1/tickets/next.
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub ticket: TicketBody,
    /// Where to claim the print job, when a receipt was stored.
    pub receipt_url: Option<String>,
}

/// Response body for POST /v1/tickets.
#[derive(Debug, Serialize)]
pub struct ManualResponse {
    /// The created ticket; absent when the number already existed.
    pub ticket: Option<TicketBody>,
    pub duplicate: bool,
}

/// Response body for POST /v1/tickets/range.
#[derive(Debug, Serialize)]
pub struct RangeResponse {
    pub issued: usize,
    pub skipped: u32,
    pub numbers: Vec<u32>,
    pub receipt_url: Option<String>,
}

/// Response body for GET /v1/counts.
#[derive(Debug, Serialize)]
pub struct CountsResponse {
    pub counts: Vec<PendingCount>,
}

/// Response body for POST /v1/admin/reset.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub removed: u64,
}

/// Response body for GET /v1/receipts/{token}.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub tickets: Vec<TicketBody>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable failure class.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// Wraps a domain error for HTTP status mapping.
pub struct ApiError(pub GuicheError);

impl From<GuicheError> for ApiError {
    fn from(err: GuicheError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            GuicheError::UnknownClass { .. } => {
                (StatusCode::BAD_REQUEST, "unknown_class", self.0.to_string())
            }
            GuicheError::InvalidNumber { .. } => {
                (StatusCode::BAD_REQUEST, "invalid_number", self.0.to_string())
            }
            GuicheError::BatchTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, "batch_too_large", self.0.to_string())
            }
            GuicheError::Config(_) => (StatusCode::BAD_REQUEST, "config", self.0.to_string()),
            GuicheError::CapacityExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "capacity_exceeded",
                self.0.to_string(),
            ),
            GuicheError::UnknownOperator { .. } => {
                (StatusCode::NOT_FOUND, "unknown_operator", self.0.to_string())
            }
            GuicheError::EmptyQueue { .. } => {
                (StatusCode::CONFLICT, "empty_queue", self.0.to_string())
            }
            GuicheError::NothingCalled { .. } => {
                (StatusCode::CONFLICT, "nothing_called", self.0.to_string())
            }
            GuicheError::Ledger { .. } => {
                error!(error = %self.0, "request failed in the ledger");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ledger",
                    "ticket ledger failure".to_string(),
                )
            }
            GuicheError::Gateway { .. } | GuicheError::Internal(_) => {
                error!(error = %self.0, "request failed internally");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal error".to_string(),
                )
            }
        };
        (
            status,
            Json(ErrorBody { code: code.to_string(), message }),
        )
            .into_response()
    }
}

fn receipt_url(token: &ReceiptToken) -> String {
    format!("/v1/receipts/{token}")
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.service.health().await {
        HealthStatus::Healthy => "ok".to_string(),
        HealthStatus::Degraded(_) => "degraded".to_string(),
        HealthStatus::Unhealthy(_) => "unhealthy".to_string(),
    };
    Json(HealthResponse {
        status,
        version: state.version.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// POST /v1/tickets/next
pub async fn post_ticket_next(
    State(state): State<AppState>,
    Json(body): Json<IssueNextRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    let class = QueueClass::from_code(&body.class)?;
    let outcome = state.service.issue_next(class).await?;
    Ok(Json(IssueResponse {
        ticket: TicketBody::from(&outcome.ticket),
        receipt_url: outcome.receipt.as_ref().map(receipt_url),
    }))
}

/// POST /v1/tickets
pub async fn post_ticket_manual(
    State(state): State<AppState>,
    Json(body): Json<IssueManualRequest>,
) -> Result<Json<ManualResponse>, ApiError> {
    let class = QueueClass::from_code(&body.class)?;
    let outcome = state.service.issue_manual(class, body.number).await?;
    let response = match outcome {
        ManualOutcome::Issued(ticket) => ManualResponse {
            ticket: Some(TicketBody::from(&ticket)),
            duplicate: false,
        },
        ManualOutcome::AlreadyExists => ManualResponse { ticket: None, duplicate: true },
    };
    Ok(Json(response))
}

/// POST /v1/tickets/range
pub async fn post_ticket_range(
    State(state): State<AppState>,
    Json(body): Json<IssueRangeRequest>,
) -> Result<Json<RangeResponse>, ApiError> {
    let class = QueueClass::from_code(&body.class)?;
    let outcome = state.service.issue_range(class, body.start, body.end).await?;
    Ok(Json(RangeResponse {
        issued: outcome.issued.len(),
        skipped: outcome.skipped,
        numbers: outcome.issued.iter().map(|t| t.number).collect(),
        receipt_url: outcome.receipt.as_ref().map(receipt_url),
    }))
}

/// POST /v1/calls/next
pub async fn post_call_next(
    State(state): State<AppState>,
    Json(body): Json<CallNextRequest>,
) -> Result<Json<CallEvent>, ApiError> {
    let class = QueueClass::from_code(&body.class)?;
    let operator = OperatorId(body.operator_id);
    let event = state.service.call_next(class, &operator).await?;
    Ok(Json(event))
}

/// POST /v1/calls/recall
pub async fn post_call_recall(
    State(state): State<AppState>,
    Json(body): Json<RecallRequest>,
) -> Result<Json<CallEvent>, ApiError> {
    let operator = OperatorId(body.operator_id);
    let event = state.service.recall_last(&operator).await?;
    Ok(Json(event))
}

/// GET /v1/counts
pub async fn get_counts(
    State(state): State<AppState>,
) -> Result<Json<CountsResponse>, ApiError> {
    let counts = state.service.pending_counts().await?;
    Ok(Json(CountsResponse { counts }))
}

/// POST /v1/admin/reset
pub async fn post_admin_reset(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, ApiError> {
    let removed = state.service.reset().await?;
    Ok(Json(ResetResponse { removed }))
}

/// GET /v1/receipts/{token}
///
/// Claiming is one-shot: a second request for the same token is a 404.
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    match state.jobs.take(&token) {
        Some(tickets) => {
            let body = ReceiptResponse {
                tickets: tickets.iter().map(TicketBody::from).collect(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                code: "receipt_not_found".to_string(),
                message: "no unclaimed print job for this token".to_string(),
            }),
        )
            .into_response(),
    }
}
