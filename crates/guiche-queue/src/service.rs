// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service facade tying issuance, call flow, counts, and reset together.
//!
//! `TicketService` is what the gateway and the CLI talk to. It owns the
//! collaborator seams (ledger, operator directory, receipt sink), the
//! announcement bus, and the clock, and it captures one [`IssueStamp`] per
//! operation so an operation never straddles a day or shift boundary.

use std::sync::Arc;

use guiche_bus::{CallEnvelope, TicketBus};
use guiche_config::model::CountersConfig;
use guiche_core::clock::Clock;
use guiche_core::error::GuicheError;
use guiche_core::traits::{OperatorDirectory, ReceiptSink, TicketLedger};
use guiche_core::types::{
    CallEvent, ClassSet, HealthStatus, IssueOutcome, IssueStamp, ManualOutcome, OperatorId,
    PendingCount, QueueClass, RangeOutcome, RateScope, ReceiptToken, Ticket,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::allocator::Allocator;
use crate::dispatcher::Dispatcher;
use crate::limiter::RateLimiter;

/// Validated counter settings, resolved from configuration once at startup.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub class_set: ClassSet,
    pub daily_cap: u32,
    pub shift_cap: u32,
    pub max_batch: u32,
    pub scope: RateScope,
}

impl QueueSettings {
    /// Resolves the `[counters]` section into domain values.
    pub fn from_config(config: &CountersConfig) -> Result<Self, GuicheError> {
        Ok(Self {
            class_set: ClassSet::from_origins(&config.origin_list()?),
            daily_cap: config.daily_cap,
            shift_cap: config.shift_cap,
            max_batch: config.max_batch,
            scope: config.scope()?,
        })
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            class_set: ClassSet::all(),
            daily_cap: 400,
            shift_cap: 200,
            max_batch: 500,
            scope: RateScope::Global,
        }
    }
}

/// Front door for every queue operation.
pub struct TicketService {
    ledger: Arc<dyn TicketLedger>,
    allocator: Allocator,
    dispatcher: Dispatcher,
    receipts: Arc<dyn ReceiptSink>,
    bus: Arc<TicketBus>,
    clock: Arc<dyn Clock>,
    class_set: ClassSet,
}

impl TicketService {
    pub fn new(
        ledger: Arc<dyn TicketLedger>,
        directory: Arc<dyn OperatorDirectory>,
        receipts: Arc<dyn ReceiptSink>,
        bus: Arc<TicketBus>,
        clock: Arc<dyn Clock>,
        settings: QueueSettings,
    ) -> Self {
        let limiter = RateLimiter::new(settings.daily_cap, settings.shift_cap, settings.scope);
        let allocator = Allocator::new(Arc::clone(&ledger), limiter, settings.max_batch);
        let dispatcher = Dispatcher::new(Arc::clone(&ledger), directory, Arc::clone(&bus));
        Self {
            ledger,
            allocator,
            dispatcher,
            receipts,
            bus,
            clock,
            class_set: settings.class_set,
        }
    }

    /// Issues the next sequential ticket for the class.
    pub async fn issue_next(&self, class: QueueClass) -> Result<IssueOutcome, GuicheError> {
        self.class_set.ensure(class)?;
        let stamp = self.stamp();
        let ticket = self.allocator.issue_next(class, &stamp).await?;
        info!(class = %class, number = ticket.number, "ticket issued");

        let receipt = self.deliver_receipts(std::slice::from_ref(&ticket)).await;
        Ok(IssueOutcome { ticket, receipt })
    }

    /// Records a specific ticket number, idempotently. No receipt: manual
    /// entries mirror paper tickets that already exist at the counter.
    pub async fn issue_manual(
        &self,
        class: QueueClass,
        number: i64,
    ) -> Result<ManualOutcome, GuicheError> {
        self.class_set.ensure(class)?;
        let stamp = self.stamp();
        let outcome = self.allocator.issue_manual(class, number, &stamp).await?;
        match &outcome {
            ManualOutcome::Issued(ticket) => {
                info!(class = %class, number = ticket.number, "manual ticket recorded");
            }
            ManualOutcome::AlreadyExists => {
                debug!(class = %class, number, "manual number already present");
            }
        }
        Ok(outcome)
    }

    /// Issues every absent number in an inclusive range; bounds in any order.
    pub async fn issue_range(
        &self,
        class: QueueClass,
        a: i64,
        b: i64,
    ) -> Result<RangeOutcome, GuicheError> {
        self.class_set.ensure(class)?;
        let stamp = self.stamp();
        let report = self.allocator.issue_range(class, a, b, &stamp).await?;
        info!(
            class = %class,
            issued = report.issued.len(),
            skipped = report.skipped,
            "range issued"
        );

        let receipt = self.deliver_receipts(&report.issued).await;
        Ok(RangeOutcome { issued: report.issued, skipped: report.skipped, receipt })
    }

    /// Calls the oldest waiting ticket of the class for the operator.
    pub async fn call_next(
        &self,
        class: QueueClass,
        operator: &OperatorId,
    ) -> Result<CallEvent, GuicheError> {
        self.class_set.ensure(class)?;
        let stamp = self.stamp();
        let event = self.dispatcher.call_next(class, operator, &stamp.day, &stamp.at).await?;
        info!(class = %class, number = event.number, operator = %operator, "ticket called");
        Ok(event)
    }

    /// Re-announces the operator's most recent call.
    pub async fn recall_last(&self, operator: &OperatorId) -> Result<CallEvent, GuicheError> {
        let stamp = self.stamp();
        let event = self.dispatcher.recall_last(operator, &stamp.at).await?;
        info!(
            class = %event.class,
            number = event.number,
            operator = %operator,
            "ticket re-announced"
        );
        Ok(event)
    }

    /// Today's uncalled tickets, one entry per enabled class, zeros included.
    pub async fn pending_counts(&self) -> Result<Vec<PendingCount>, GuicheError> {
        let stamp = self.stamp();
        let counted = self.ledger.pending_counts(&stamp.day).await?;
        Ok(self
            .class_set
            .classes()
            .iter()
            .map(|&class| PendingCount {
                class,
                pending: counted
                    .iter()
                    .find(|c| c.class == class)
                    .map_or(0, |c| c.pending),
            })
            .collect())
    }

    /// Deletes every ticket and restarts numbering. Returns rows removed.
    pub async fn reset(&self) -> Result<u64, GuicheError> {
        let removed = self.ledger.purge_all().await?;
        info!(removed, "ticket ledger reset");
        Ok(removed)
    }

    /// Ledger liveness, surfaced by the gateway's health route.
    pub async fn health(&self) -> HealthStatus {
        match self.ledger.health_check().await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }

    /// A fresh feed of call announcements.
    pub fn subscribe(&self) -> broadcast::Receiver<CallEnvelope> {
        self.bus.subscribe()
    }

    /// The classes this deployment serves.
    pub fn classes(&self) -> &ClassSet {
        &self.class_set
    }

    fn stamp(&self) -> IssueStamp {
        IssueStamp::capture(self.clock.now())
    }

    /// Hands tickets to the receipt sink. Failures are logged, never
    /// propagated -- the issuance has already committed.
    async fn deliver_receipts(&self, tickets: &[Ticket]) -> Option<ReceiptToken> {
        if tickets.is_empty() {
            return None;
        }
        match self.receipts.deliver(tickets.to_vec()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, count = tickets.len(), "receipt delivery failed (non-fatal)");
                None
            }
        }
    }
}
