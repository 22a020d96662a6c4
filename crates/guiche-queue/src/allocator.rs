// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket number allocation: sequential, manual, and span issuance.
//!
//! Sequential issuance is the only path that derives a number itself, so it
//! runs under a per-(class, day) lock to stay gap-free. Manual and range
//! placement name their numbers up front and lean on the ledger's atomic
//! insert-if-absent instead, which makes a repeated request idempotent
//! rather than an error.

use std::sync::Arc;

use guiche_core::error::GuicheError;
use guiche_core::traits::TicketLedger;
use guiche_core::types::{IssueStamp, ManualOutcome, NewTicket, QueueClass, SpanReport, Ticket};

use crate::limiter::RateLimiter;
use crate::locks::KeyedLocks;

/// Issues ticket numbers against the ledger, applying rate caps and the
/// batch ceiling.
pub struct Allocator {
    ledger: Arc<dyn TicketLedger>,
    locks: KeyedLocks,
    limiter: RateLimiter,
    max_batch: u32,
}

impl Allocator {
    pub fn new(ledger: Arc<dyn TicketLedger>, limiter: RateLimiter, max_batch: u32) -> Self {
        Self { ledger, locks: KeyedLocks::new(), limiter, max_batch }
    }

    /// Issues the next sequential number for the class on the stamp's day.
    ///
    /// Holding the keyed lock across read-max -> insert means number `n` is
    /// only handed out once `1..n-1` exist, so the sequence has no gaps
    /// and no duplicates whatever the concurrency.
    pub async fn issue_next(
        &self,
        class: QueueClass,
        stamp: &IssueStamp,
    ) -> Result<Ticket, GuicheError> {
        self.limiter.admit(self.ledger.as_ref(), class, 1, stamp).await?;

        let _slot = self.locks.acquire(class, &stamp.day).await;
        let number = match self.ledger.max_number(class, &stamp.day).await? {
            Some(n) => n + 1,
            None => 1,
        };
        self.ledger
            .insert_if_absent(NewTicket::new(class, number, stamp))
            .await?
            .ok_or_else(|| {
                GuicheError::Internal(format!(
                    "number {number} for {class} was taken while the allocation lock was held"
                ))
            })
    }

    /// Records a specific number, e.g. for a paper ticket written by hand.
    ///
    /// Succeeds with `AlreadyExists` when the number is taken; the atomic
    /// conditional insert needs no allocation lock.
    pub async fn issue_manual(
        &self,
        class: QueueClass,
        number: i64,
        stamp: &IssueStamp,
    ) -> Result<ManualOutcome, GuicheError> {
        let number = validate_number(number)?;
        self.limiter.admit(self.ledger.as_ref(), class, 1, stamp).await?;

        match self.ledger.insert_if_absent(NewTicket::new(class, number, stamp)).await? {
            Some(ticket) => Ok(ManualOutcome::Issued(ticket)),
            None => Ok(ManualOutcome::AlreadyExists),
        }
    }

    /// Issues every absent number in an inclusive span. The bounds may
    /// arrive in either order.
    ///
    /// Only the numbers that will actually be created are counted against
    /// the rate caps, so re-submitting a partially existing span is not
    /// penalized twice.
    pub async fn issue_range(
        &self,
        class: QueueClass,
        a: i64,
        b: i64,
        stamp: &IssueStamp,
    ) -> Result<SpanReport, GuicheError> {
        let (lo, hi) = normalize_span(a, b, self.max_batch)?;

        let existing = self.ledger.count_existing_in_span(class, lo, hi, &stamp.day).await?;
        let to_create = (hi - lo + 1).saturating_sub(existing);
        self.limiter.admit(self.ledger.as_ref(), class, to_create, stamp).await?;

        self.ledger.insert_span(class, lo, hi, stamp).await
    }
}

/// Orders and validates inclusive span bounds. The smaller bound comes
/// back first whichever way the caller passed them.
fn normalize_span(a: i64, b: i64, max_batch: u32) -> Result<(u32, u32), GuicheError> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo = validate_number(lo)?;
    let hi = validate_number(hi)?;

    let span = hi - lo + 1;
    if span > max_batch {
        return Err(GuicheError::BatchTooLarge { requested: span, max: max_batch });
    }
    Ok((lo, hi))
}

/// Ticket numbers start at 1 and must fit the stored `u32` form.
fn validate_number(value: i64) -> Result<u32, GuicheError> {
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(GuicheError::InvalidNumber { value });
    }
    Ok(value as u32)
}
