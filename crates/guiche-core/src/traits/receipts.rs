// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receipt sink trait: the print-rendering handoff.

use async_trait::async_trait;
use tracing::debug;

use crate::error::GuicheError;
use crate::types::{ReceiptToken, Ticket};

/// Accepts freshly issued tickets for receipt rendering.
///
/// The queue core's only obligation is to hand over the ticket set after a
/// successful issuance; a sink that mints claim tokens returns one so the
/// caller can reference the rendered artifact. Delivery failures must not
/// undo an issuance, so callers log and move on.
#[async_trait]
pub trait ReceiptSink: Send + Sync {
    async fn deliver(&self, tickets: Vec<Ticket>)
    -> Result<Option<ReceiptToken>, GuicheError>;
}

/// Sink for deployments without printers. Accepts everything, mints nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReceipts;

#[async_trait]
impl ReceiptSink for NullReceipts {
    async fn deliver(
        &self,
        tickets: Vec<Ticket>,
    ) -> Result<Option<ReceiptToken>, GuicheError> {
        debug!(count = tickets.len(), "receipt sink disabled, dropping handoff");
        Ok(None)
    }
}
