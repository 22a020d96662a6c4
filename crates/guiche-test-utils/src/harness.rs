// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `CounterHarness` assembles a complete ticket service with a temp SQLite
//! ledger, a pinned clock, a static station table, and a recording receipt
//! sink. Drive it through `issue()`/`call()`/`recall()` or reach into the
//! public fields for assertions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};

use guiche_bus::{CallEnvelope, TicketBus};
use guiche_config::model::StorageConfig;
use guiche_core::{
    CallEvent, FixedClock, GuicheError, IssueOutcome, ManualOutcome, OperatorId, QueueClass,
    StaticDirectory, Station, TicketLedger,
};
use guiche_ledger::SqliteLedger;
use guiche_queue::{QueueSettings, TicketService};
use tokio::sync::broadcast;

use crate::mock_receipts::MockReceipts;

/// Builder for creating test environments with configurable options.
pub struct CounterHarnessBuilder {
    settings: QueueSettings,
    start: Option<DateTime<Local>>,
    stations: HashMap<String, Station>,
}

impl CounterHarnessBuilder {
    fn new() -> Self {
        let mut stations = HashMap::new();
        stations.insert(
            "maria".to_string(),
            Station { room: "3".to_string(), desk: "1".to_string() },
        );
        stations.insert(
            "joao".to_string(),
            Station { room: "3".to_string(), desk: "2".to_string() },
        );
        Self {
            settings: QueueSettings::default(),
            start: None,
            stations,
        }
    }

    /// Replace the counter settings wholesale.
    pub fn with_settings(mut self, settings: QueueSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the daily and shift caps, keeping the other settings at defaults.
    pub fn with_caps(mut self, daily_cap: u32, shift_cap: u32) -> Self {
        self.settings.daily_cap = daily_cap;
        self.settings.shift_cap = shift_cap;
        self
    }

    /// Pin the clock to a specific instant instead of the default morning.
    pub fn starting_at(mut self, at: DateTime<Local>) -> Self {
        self.start = Some(at);
        self
    }

    /// Add or replace an operator's station assignment.
    pub fn with_station(mut self, operator: &str, room: &str, desk: &str) -> Self {
        self.stations.insert(
            operator.to_string(),
            Station { room: room.to_string(), desk: desk.to_string() },
        );
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<CounterHarness, GuicheError> {
        // Create temp directory for SQLite
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| GuicheError::Ledger { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        // Initialize the SQLite ledger
        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        };
        let ledger: Arc<dyn TicketLedger> = Arc::new(SqliteLedger::new(storage_config));
        ledger.initialize().await?;

        let clock = Arc::new(FixedClock::new(self.start.unwrap_or_else(default_start)));
        let receipts = Arc::new(MockReceipts::new());
        let bus = Arc::new(TicketBus::new(32));
        let directory = Arc::new(StaticDirectory::new(self.stations));

        let service = Arc::new(TicketService::new(
            Arc::clone(&ledger),
            directory,
            Arc::clone(&receipts) as Arc<dyn guiche_core::ReceiptSink>,
            Arc::clone(&bus),
            Arc::clone(&clock) as Arc<dyn guiche_core::Clock>,
            self.settings,
        ));

        Ok(CounterHarness {
            service,
            ledger,
            receipts,
            clock,
            bus,
            _temp_dir: temp_dir,
        })
    }
}

/// Default business morning: a Monday at 09:00 local, well clear of the
/// noon shift boundary.
fn default_start() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_else(Local::now)
}

/// A complete test environment with a temp ledger and mock receipt sink.
///
/// Public fields give tests direct access to every subsystem; the driver
/// methods cover the common issue/call/recall flows.
pub struct CounterHarness {
    /// The assembled ticket service.
    pub service: Arc<TicketService>,
    /// The SQLite ledger (temp DB, cleaned up on drop).
    pub ledger: Arc<dyn TicketLedger>,
    /// The recording receipt sink.
    pub receipts: Arc<MockReceipts>,
    /// The pinned clock. Move it with [`CounterHarness::advance_to`].
    pub clock: Arc<FixedClock>,
    /// The announcement bus.
    pub bus: Arc<TicketBus>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl CounterHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> CounterHarnessBuilder {
        CounterHarnessBuilder::new()
    }

    /// Build a harness with all defaults.
    pub async fn new() -> Result<Self, GuicheError> {
        Self::builder().build().await
    }

    /// Issue the next sequential ticket for the class code.
    pub async fn issue(&self, code: &str) -> Result<IssueOutcome, GuicheError> {
        self.service.issue_next(QueueClass::from_code(code)?).await
    }

    /// Record a specific ticket number for the class code.
    pub async fn issue_manual(
        &self,
        code: &str,
        number: i64,
    ) -> Result<ManualOutcome, GuicheError> {
        self.service.issue_manual(QueueClass::from_code(code)?, number).await
    }

    /// Call the oldest waiting ticket of the class for the operator.
    pub async fn call(&self, code: &str, operator: &str) -> Result<CallEvent, GuicheError> {
        self.service
            .call_next(QueueClass::from_code(code)?, &OperatorId(operator.to_string()))
            .await
    }

    /// Re-announce the operator's most recent call.
    pub async fn recall(&self, operator: &str) -> Result<CallEvent, GuicheError> {
        self.service.recall_last(&OperatorId(operator.to_string())).await
    }

    /// Today's pending count for the class code (zero when nothing waits).
    pub async fn pending(&self, code: &str) -> Result<u64, GuicheError> {
        let class = QueueClass::from_code(code)?;
        let counts = self.service.pending_counts().await?;
        Ok(counts
            .iter()
            .find(|c| c.class == class)
            .map_or(0, |c| c.pending))
    }

    /// Move the pinned clock, e.g. across a day or shift boundary.
    pub fn advance_to(&self, at: DateTime<Local>) {
        self.clock.set(at);
    }

    /// A fresh feed of call announcements.
    pub fn subscribe(&self) -> broadcast::Receiver<CallEnvelope> {
        self.service.subscribe()
    }
}
