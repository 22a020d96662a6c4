// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call flow: dispatching the next waiting ticket and re-announcing the
//! last one.
//!
//! The station lookup happens before the ledger is touched, so a request
//! from an operator without a station assignment marks nothing as called.
//! The ledger's fused select-and-mark is the serialization point; no
//! app-level lock is involved in calling.

use std::sync::Arc;

use guiche_bus::TicketBus;
use guiche_core::error::GuicheError;
use guiche_core::traits::{OperatorDirectory, TicketLedger};
use guiche_core::types::{CallEvent, OperatorId, QueueClass, Station};

/// Moves tickets from waiting to called and announces them on the bus.
pub struct Dispatcher {
    ledger: Arc<dyn TicketLedger>,
    directory: Arc<dyn OperatorDirectory>,
    bus: Arc<TicketBus>,
}

impl Dispatcher {
    pub fn new(
        ledger: Arc<dyn TicketLedger>,
        directory: Arc<dyn OperatorDirectory>,
        bus: Arc<TicketBus>,
    ) -> Self {
        Self { ledger, directory, bus }
    }

    /// Calls the oldest waiting ticket of the class issued on `day`.
    ///
    /// Oldest means smallest number; insertion order breaks ties. The
    /// ticket is marked called and the announcement is published before
    /// returning -- publish is fire-and-forget, zero subscribers is fine.
    pub async fn call_next(
        &self,
        class: QueueClass,
        operator: &OperatorId,
        day: &str,
        at: &str,
    ) -> Result<CallEvent, GuicheError> {
        let station = self.station_for(operator).await?;
        let ticket = self
            .ledger
            .take_oldest_uncalled(class, day, operator, at)
            .await?
            .ok_or(GuicheError::EmptyQueue { class })?;

        let event = CallEvent { class, number: ticket.number, station };
        self.bus.publish(event.clone());
        Ok(event)
    }

    /// Re-announces the ticket the operator most recently called.
    ///
    /// Call state does not change and the ticket does not rejoin the
    /// waiting pool; only `updated_at` is touched. The emitted event is
    /// indistinguishable from the original call.
    pub async fn recall_last(
        &self,
        operator: &OperatorId,
        at: &str,
    ) -> Result<CallEvent, GuicheError> {
        let station = self.station_for(operator).await?;
        let ticket = self
            .ledger
            .last_called_by(operator)
            .await?
            .ok_or_else(|| GuicheError::NothingCalled { operator: operator.clone() })?;

        self.ledger.touch(ticket.id, at).await?;

        let event = CallEvent { class: ticket.class, number: ticket.number, station };
        self.bus.publish(event.clone());
        Ok(event)
    }

    async fn station_for(&self, operator: &OperatorId) -> Result<Station, GuicheError> {
        self.directory
            .lookup_station(operator)
            .await?
            .ok_or_else(|| GuicheError::UnknownOperator { operator: operator.clone() })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Local, TimeZone};
    use guiche_config::StorageConfig;
    use guiche_core::traits::StaticDirectory;
    use guiche_core::types::{IssueStamp, NewTicket};
    use guiche_ledger::SqliteLedger;
    use tempfile::{tempdir, TempDir};

    use super::*;

    async fn setup() -> (Dispatcher, Arc<dyn TicketLedger>, Arc<TicketBus>, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let config = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let ledger: Arc<dyn TicketLedger> = Arc::new(SqliteLedger::new(config));
        ledger.initialize().await.unwrap();

        let mut stations = HashMap::new();
        stations.insert(
            "maria".to_string(),
            Station { room: "3".to_string(), desk: "1".to_string() },
        );
        stations.insert(
            "joao".to_string(),
            Station { room: "3".to_string(), desk: "2".to_string() },
        );
        let directory = Arc::new(StaticDirectory::new(stations));
        let bus = Arc::new(TicketBus::new(32));

        let dispatcher = Dispatcher::new(Arc::clone(&ledger), directory, Arc::clone(&bus));
        (dispatcher, ledger, bus, dir)
    }

    fn class(code: &str) -> QueueClass {
        QueueClass::from_code(code).unwrap()
    }

    fn stamp() -> IssueStamp {
        IssueStamp::capture(Local.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    fn operator(name: &str) -> OperatorId {
        OperatorId(name.to_string())
    }

    async fn put(ledger: &dyn TicketLedger, code: &str, number: u32, stamp: &IssueStamp) {
        ledger
            .insert_if_absent(NewTicket::new(class(code), number, stamp))
            .await
            .unwrap()
            .expect("number should be free");
    }

    #[tokio::test]
    async fn calls_oldest_number_first() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EN", 5, &stamp).await;
        put(ledger.as_ref(), "EN", 2, &stamp).await;
        put(ledger.as_ref(), "EN", 3, &stamp).await;

        let first = dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        assert_eq!(first.number, 2);
        assert_eq!(first.station.desk, "1");

        let second = dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        assert_eq!(second.number, 3);
    }

    #[tokio::test]
    async fn racing_operators_never_share_a_ticket() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let stamp = stamp();
        for number in 1..=8 {
            put(ledger.as_ref(), "EN", number, &stamp).await;
        }

        let dispatcher = Arc::new(dispatcher);
        let mut handles = Vec::new();
        for i in 0..8 {
            let dispatcher = Arc::clone(&dispatcher);
            let stamp = stamp.clone();
            let who = if i % 2 == 0 { "maria" } else { "joao" };
            handles.push(tokio::spawn(async move {
                dispatcher
                    .call_next(class("EN"), &operator(who), &stamp.day, &stamp.at)
                    .await
                    .unwrap()
                    .number
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();
        assert_eq!(
            numbers,
            (1..=8).collect::<Vec<u32>>(),
            "every ticket is served exactly once"
        );
    }

    #[tokio::test]
    async fn unknown_operator_marks_nothing() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EN", 1, &stamp).await;

        let err = dispatcher
            .call_next(class("EN"), &operator("ghost"), &stamp.day, &stamp.at)
            .await
            .unwrap_err();
        assert!(matches!(err, GuicheError::UnknownOperator { .. }));

        // The ticket is still waiting for a real operator.
        let event = dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        assert_eq!(event.number, 1);
    }

    #[tokio::test]
    async fn empty_queue_is_reported_per_class() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EN", 1, &stamp).await;

        let err = dispatcher
            .call_next(class("MP"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GuicheError::EmptyQueue { class } if class == QueueClass::from_code("MP").unwrap()
        ));
    }

    #[tokio::test]
    async fn call_publishes_announcement() {
        let (dispatcher, ledger, bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EP", 1, &stamp).await;

        let mut rx = bus.subscribe();
        let event = dispatcher
            .call_next(class("EP"), &operator("joao"), &stamp.day, &stamp.at)
            .await
            .unwrap();

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, event);
    }

    #[tokio::test]
    async fn recall_reemits_identical_payload_without_requeue() {
        let (dispatcher, ledger, bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EN", 1, &stamp).await;
        put(ledger.as_ref(), "EN", 2, &stamp).await;

        let mut rx = bus.subscribe();
        let called = dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        let recalled = dispatcher.recall_last(&operator("maria"), &stamp.at).await.unwrap();
        assert_eq!(called, recalled);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event, second.event);
        assert_ne!(first.event_id, second.event_id);

        // The recalled ticket did not rejoin the queue: the next call
        // serves number 2, not 1 again.
        let next = dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        assert_eq!(next.number, 2);
    }

    #[tokio::test]
    async fn recall_tracks_the_most_recent_call_per_operator() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let stamp = stamp();
        put(ledger.as_ref(), "EN", 1, &stamp).await;
        put(ledger.as_ref(), "EP", 1, &stamp).await;

        dispatcher
            .call_next(class("EN"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();
        dispatcher
            .call_next(class("EP"), &operator("maria"), &stamp.day, &stamp.at)
            .await
            .unwrap();

        let recalled = dispatcher.recall_last(&operator("maria"), &stamp.at).await.unwrap();
        assert_eq!(recalled.class, class("EP"), "the later call wins");
    }

    #[tokio::test]
    async fn recall_without_history_is_rejected() {
        let (dispatcher, _ledger, _bus, _dir) = setup().await;
        let stamp = stamp();

        let err = dispatcher.recall_last(&operator("joao"), &stamp.at).await.unwrap_err();
        assert!(matches!(
            err,
            GuicheError::NothingCalled { ref operator } if operator.0 == "joao"
        ));
    }

    #[tokio::test]
    async fn calls_are_scoped_to_the_issue_day() {
        let (dispatcher, ledger, _bus, _dir) = setup().await;
        let yesterday =
            IssueStamp::capture(Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        let today = stamp();
        put(ledger.as_ref(), "EN", 1, &yesterday).await;

        let err = dispatcher
            .call_next(class("EN"), &operator("maria"), &today.day, &today.at)
            .await
            .unwrap_err();
        assert!(matches!(err, GuicheError::EmptyQueue { .. }), "stale tickets are not served");
    }
}
