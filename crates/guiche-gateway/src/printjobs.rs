// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store of unclaimed print jobs.
//!
//! Issuance routes hand freshly created tickets here; the store mints an
//! opaque token and keeps the tickets until the printer kiosk claims them
//! via `GET /v1/receipts/{token}` or the TTL runs out. A claim is one-shot:
//! the job is removed as it is read, so a receipt never prints twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use guiche_core::error::GuicheError;
use guiche_core::traits::ReceiptSink;
use guiche_core::types::{ReceiptToken, Ticket};
use tokio::time::Instant;
use tracing::debug;

/// How often the background task sweeps expired jobs.
const SWEEP_PERIOD: Duration = Duration::from_secs(30);

struct PrintJob {
    tickets: Vec<Ticket>,
    expires_at: Instant,
}

/// Token-addressed store of tickets waiting to be printed.
pub struct PrintJobStore {
    jobs: DashMap<String, PrintJob>,
    ttl: Duration,
}

impl PrintJobStore {
    pub fn new(ttl: Duration) -> Self {
        Self { jobs: DashMap::new(), ttl }
    }

    /// Claims a job, removing it. Expired jobs are gone even if the
    /// sweeper has not reached them yet.
    pub fn take(&self, token: &str) -> Option<Vec<Ticket>> {
        let (_, job) = self.jobs.remove(token)?;
        if job.expires_at <= Instant::now() {
            return None;
        }
        Some(job.tickets)
    }

    /// Number of unclaimed jobs currently held.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drops every job past its deadline; returns how many went.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.jobs.len();
        self.jobs.retain(|_, job| job.expires_at > now);
        before - self.jobs.len()
    }

    /// Spawns the periodic sweep task. The task runs until aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_PERIOD);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    debug!(removed, "expired print jobs swept");
                }
            }
        })
    }
}

#[async_trait]
impl ReceiptSink for PrintJobStore {
    async fn deliver(&self, tickets: Vec<Ticket>) -> Result<Option<ReceiptToken>, GuicheError> {
        let token = uuid::Uuid::new_v4().to_string();
        self.jobs.insert(
            token.clone(),
            PrintJob { tickets, expires_at: Instant::now() + self.ttl },
        );
        debug!(token = token.as_str(), "print job stored");
        Ok(Some(ReceiptToken(token)))
    }
}

#[cfg(test)]
mod tests {
    use guiche_core::types::{IssueStamp, NewTicket, QueueClass, Shift};

    use super::*;

    fn ticket(number: u32) -> Ticket {
        let class = QueueClass::from_code("EN").unwrap();
        let stamp = IssueStamp {
            day: "2026-03-02".to_string(),
            shift: Shift::Morning,
            at: "2026-03-02T09:00:00-03:00".to_string(),
        };
        let new = NewTicket::new(class, number, &stamp);
        Ticket {
            id: i64::from(number),
            class: new.class,
            number: new.number,
            issued_on: new.issued_on,
            issued_at: new.issued_at,
            shift: new.shift,
            called: false,
            called_by: None,
            called_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn deliver_then_take_returns_the_tickets() {
        let store = PrintJobStore::new(Duration::from_secs(300));

        let token = store.deliver(vec![ticket(1), ticket(2)]).await.unwrap().unwrap();
        let claimed = store.take(&token.0).unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].number, 1);
    }

    #[tokio::test]
    async fn take_is_one_shot() {
        let store = PrintJobStore::new(Duration::from_secs(300));

        let token = store.deliver(vec![ticket(1)]).await.unwrap().unwrap();
        assert!(store.take(&token.0).is_some());
        assert!(store.take(&token.0).is_none());
    }

    #[tokio::test]
    async fn unknown_token_yields_nothing() {
        let store = PrintJobStore::new(Duration::from_secs(300));
        assert!(store.take("no-such-token").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_job_cannot_be_claimed() {
        let store = PrintJobStore::new(Duration::from_secs(10));

        let token = store.deliver(vec![ticket(1)]).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.take(&token.0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_expired_jobs() {
        let store = PrintJobStore::new(Duration::from_secs(10));

        store.deliver(vec![ticket(1)]).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.deliver(vec![ticket(2)]).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_clears_the_store() {
        let store = Arc::new(PrintJobStore::new(Duration::from_secs(10)));
        let sweeper = store.spawn_sweeper();
        // Let the spawned sweeper register its interval at t=0 before the
        // paused clock advances; otherwise its first sweep lands at t=61.
        tokio::task::yield_now().await;

        store.deliver(vec![ticket(1)]).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert!(store.is_empty());
        sweeper.abort();
    }

    #[tokio::test]
    async fn tokens_are_unique_per_delivery() {
        let store = PrintJobStore::new(Duration::from_secs(300));

        let a = store.deliver(vec![ticket(1)]).await.unwrap().unwrap();
        let b = store.deliver(vec![ticket(2)]).await.unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
