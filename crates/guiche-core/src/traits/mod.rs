// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Guiche queue core.
//!
//! The core talks to its surroundings through these seams: the durable
//! ticket ledger, the operator directory, and the receipt sink. All use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod directory;
pub mod ledger;
pub mod receipts;

// Re-export all traits at the traits module level for convenience.
pub use directory::{OperatorDirectory, StaticDirectory};
pub use ledger::TicketLedger;
pub use receipts::{NullReceipts, ReceiptSink};
