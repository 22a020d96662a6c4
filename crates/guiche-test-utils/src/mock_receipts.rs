// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock receipt sink for deterministic testing.
//!
//! `MockReceipts` implements `ReceiptSink`, capturing every delivered batch
//! and minting sequential claim tokens for assertion in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use guiche_core::{GuicheError, ReceiptSink, ReceiptToken, Ticket};

/// A recording receipt sink for testing.
///
/// Every batch handed to `deliver()` is captured and retrievable via
/// `deliveries()`. Tokens are minted sequentially (`receipt-1`,
/// `receipt-2`, ...) so tests can assert exact values.
pub struct MockReceipts {
    deliveries: Mutex<Vec<Vec<Ticket>>>,
    sequence: AtomicU64,
}

impl MockReceipts {
    /// Create a new mock sink with no captured deliveries.
    pub fn new() -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// All batches delivered so far, oldest first.
    pub async fn deliveries(&self) -> Vec<Vec<Ticket>> {
        self.deliveries.lock().await.clone()
    }

    /// Number of batches delivered.
    pub async fn delivery_count(&self) -> usize {
        self.deliveries.lock().await.len()
    }

    /// Clear captured deliveries. Token numbering keeps counting.
    pub async fn clear_deliveries(&self) {
        self.deliveries.lock().await.clear();
    }
}

impl Default for MockReceipts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReceiptSink for MockReceipts {
    async fn deliver(
        &self,
        tickets: Vec<Ticket>,
    ) -> Result<Option<ReceiptToken>, GuicheError> {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.deliveries.lock().await.push(tickets);
        Ok(Some(ReceiptToken(format!("receipt-{n}"))))
    }
}
