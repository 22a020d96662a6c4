// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket ledger trait: the durable-store seam for issuance and calling.

use async_trait::async_trait;

use crate::error::GuicheError;
use crate::types::{
    HealthStatus, IssueStamp, NewTicket, OperatorId, Origin, PendingCount, QueueClass, RateWindow,
    Shift, SpanReport, Ticket,
};

/// Durable, ordered ticket store.
///
/// Every mutating operation is atomic: callers never observe a
/// half-committed insert, and the select-and-mark of
/// [`take_oldest_uncalled`](TicketLedger::take_oldest_uncalled) happens in
/// one transaction so a ticket can be taken exactly once.
#[async_trait]
pub trait TicketLedger: Send + Sync {
    /// Opens the store and brings the schema up to date.
    async fn initialize(&self) -> Result<(), GuicheError>;

    /// Flushes and closes the store.
    async fn close(&self) -> Result<(), GuicheError>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> Result<HealthStatus, GuicheError>;

    /// Highest number issued for the class on the given day, if any.
    async fn max_number(&self, class: QueueClass, day: &str)
    -> Result<Option<u32>, GuicheError>;

    /// Inserts the ticket unless its (class, number, day) already exists.
    /// Returns the stored row, or `None` when the number was taken.
    async fn insert_if_absent(&self, ticket: NewTicket) -> Result<Option<Ticket>, GuicheError>;

    /// Numbers in `lo..=hi` already present for the class on the stamp's
    /// day. Used to size a batch before the rate caps see it.
    async fn count_existing_in_span(
        &self,
        class: QueueClass,
        lo: u32,
        hi: u32,
        day: &str,
    ) -> Result<u32, GuicheError>;

    /// Inserts every absent number in `lo..=hi` in a single transaction,
    /// skipping numbers that already exist. All-or-nothing on failure.
    async fn insert_span(
        &self,
        class: QueueClass,
        lo: u32,
        hi: u32,
        stamp: &IssueStamp,
    ) -> Result<SpanReport, GuicheError>;

    /// Atomically selects the uncalled ticket of the class issued on `day`
    /// with the smallest number (ties broken by insertion id) and marks it
    /// called by `operator` at `at`. `None` when the queue is empty.
    async fn take_oldest_uncalled(
        &self,
        class: QueueClass,
        day: &str,
        operator: &OperatorId,
        at: &str,
    ) -> Result<Option<Ticket>, GuicheError>;

    /// The ticket most recently called by the operator, newest first.
    async fn last_called_by(&self, operator: &OperatorId)
    -> Result<Option<Ticket>, GuicheError>;

    /// Updates a ticket's `updated_at`. The only write a recall performs.
    async fn touch(&self, id: i64, at: &str) -> Result<(), GuicheError>;

    /// Normal-tier issuance counts for the day and for the day's `shift`,
    /// optionally narrowed to one origin.
    async fn normal_window(
        &self,
        origin: Option<Origin>,
        day: &str,
        shift: Shift,
    ) -> Result<RateWindow, GuicheError>;

    /// Uncalled tickets issued on `day`, grouped by class. Classes with no
    /// rows are absent from the result.
    async fn pending_counts(&self, day: &str) -> Result<Vec<PendingCount>, GuicheError>;

    /// Deletes every ticket and restarts numbering from scratch. Returns
    /// the number of rows removed.
    async fn purge_all(&self) -> Result<u64, GuicheError>;
}
