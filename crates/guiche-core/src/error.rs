// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Guiche ticket service.

use thiserror::Error;

use crate::types::{CapKind, OperatorId, QueueClass};

/// The primary error type used across all Guiche operations and collaborator traits.
#[derive(Debug, Error)]
pub enum GuicheError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The submitted queue-class code does not name an enabled class.
    #[error("unknown queue class: {code:?}")]
    UnknownClass { code: String },

    /// A ticket number outside the valid range (numbers start at 1).
    #[error("invalid ticket number: {value}")]
    InvalidNumber { value: i64 },

    /// A range request larger than the configured batch ceiling.
    #[error("batch of {requested} tickets exceeds the maximum of {max}")]
    BatchTooLarge { requested: u32, max: u32 },

    /// Normal-tier issuance would exceed a rate cap.
    #[error("{kind} cap reached: cap {cap}, {counted} already issued, {requested} requested")]
    CapacityExceeded {
        kind: CapKind,
        cap: u32,
        counted: u64,
        requested: u32,
    },

    /// No uncalled ticket exists for the class. A normal outcome, not a fault.
    #[error("no pending tickets for class {class}")]
    EmptyQueue { class: QueueClass },

    /// The operator has never called a ticket, so there is nothing to recall.
    #[error("operator {operator} has not called any ticket")]
    NothingCalled { operator: OperatorId },

    /// The operator directory has no station assignment for this operator.
    #[error("operator {operator} has no station assignment")]
    UnknownOperator { operator: OperatorId },

    /// Ticket ledger errors (connection, query failure, migration).
    #[error("ledger error: {source}")]
    Ledger {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Gateway transport errors (bind failure, server crash).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuicheError {
    /// Wraps an arbitrary storage-layer error as a ledger failure.
    pub fn ledger<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GuicheError::Ledger {
            source: Box::new(source),
        }
    }
}
