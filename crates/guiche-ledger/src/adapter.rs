// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the TicketLedger trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use guiche_config::model::StorageConfig;
use guiche_core::types::{
    HealthStatus, IssueStamp, NewTicket, OperatorId, Origin, PendingCount, QueueClass,
    RateWindow, Shift, SpanReport, Ticket,
};
use guiche_core::{GuicheError, TicketLedger};

use crate::database::Database;
use crate::queries;

/// SQLite-backed ticket ledger.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query module. The database is lazily opened on the first call to
/// [`TicketLedger::initialize`].
pub struct SqliteLedger {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteLedger {
    /// Create a new SqliteLedger with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, GuicheError> {
        self.db.get().ok_or_else(|| GuicheError::Ledger {
            source: "ledger not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl TicketLedger for SqliteLedger {
    async fn initialize(&self) -> Result<(), GuicheError> {
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| GuicheError::Ledger {
            source: "ledger already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "ticket ledger initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GuicheError> {
        let db = self.db()?;
        // Checkpoint WAL before shutdown.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, GuicheError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn max_number(
        &self,
        class: QueueClass,
        day: &str,
    ) -> Result<Option<u32>, GuicheError> {
        queries::tickets::max_number(self.db()?, class, day).await
    }

    async fn insert_if_absent(&self, ticket: NewTicket) -> Result<Option<Ticket>, GuicheError> {
        queries::tickets::insert_if_absent(self.db()?, ticket).await
    }

    async fn count_existing_in_span(
        &self,
        class: QueueClass,
        lo: u32,
        hi: u32,
        day: &str,
    ) -> Result<u32, GuicheError> {
        queries::tickets::count_existing_in_span(self.db()?, class, lo, hi, day).await
    }

    async fn insert_span(
        &self,
        class: QueueClass,
        lo: u32,
        hi: u32,
        stamp: &IssueStamp,
    ) -> Result<SpanReport, GuicheError> {
        queries::tickets::insert_span(self.db()?, class, lo, hi, stamp).await
    }

    async fn take_oldest_uncalled(
        &self,
        class: QueueClass,
        day: &str,
        operator: &OperatorId,
        at: &str,
    ) -> Result<Option<Ticket>, GuicheError> {
        queries::tickets::take_oldest_uncalled(self.db()?, class, day, operator, at).await
    }

    async fn last_called_by(
        &self,
        operator: &OperatorId,
    ) -> Result<Option<Ticket>, GuicheError> {
        queries::tickets::last_called_by(self.db()?, operator).await
    }

    async fn touch(&self, id: i64, at: &str) -> Result<(), GuicheError> {
        queries::tickets::touch(self.db()?, id, at).await
    }

    async fn normal_window(
        &self,
        origin: Option<Origin>,
        day: &str,
        shift: Shift,
    ) -> Result<RateWindow, GuicheError> {
        queries::tickets::normal_window(self.db()?, origin, day, shift).await
    }

    async fn pending_counts(&self, day: &str) -> Result<Vec<PendingCount>, GuicheError> {
        queries::tickets::pending_counts(self.db()?, day).await
    }

    async fn purge_all(&self) -> Result<u64, GuicheError> {
        queries::tickets::purge_all(self.db()?).await
    }
}
