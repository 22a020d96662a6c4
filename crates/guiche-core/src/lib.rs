// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Guiche ticket service.
//!
//! This crate provides the domain types, error taxonomy, clock
//! abstraction, and collaborator traits used throughout the Guiche
//! workspace. The queue core, ledger, and gateway crates all build on the
//! definitions here.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::GuicheError;
pub use types::{
    CallEvent, CapKind, ClassSet, HealthStatus, IssueOutcome, IssueStamp, ManualOutcome,
    NewTicket, OperatorId, Origin, PendingCount, QueueClass, RangeOutcome, RateScope,
    RateWindow, ReceiptToken, Shift, SpanReport, Station, Ticket, Tier,
};

// Re-export collaborator traits at crate root.
pub use traits::{NullReceipts, OperatorDirectory, ReceiptSink, StaticDirectory, TicketLedger};
