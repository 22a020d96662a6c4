// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket operations: numbered issuance, call selection, rate-window and
//! pending counts, and the full purge.

use guiche_core::types::{
    IssueStamp, NewTicket, OperatorId, Origin, PendingCount, QueueClass, RateWindow, Shift,
    SpanReport, Ticket,
};
use guiche_core::GuicheError;
use rusqlite::params;

use crate::database::Database;

/// Highest number issued for the class on the given day, `None` when the
/// class has no tickets yet.
pub async fn max_number(
    db: &Database,
    class: QueueClass,
    day: &str,
) -> Result<Option<u32>, GuicheError> {
    let origin = class.origin.to_string();
    let tier = class.tier.to_string();
    let day = day.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT MAX(number) FROM tickets
                 WHERE origin = ?1 AND tier = ?2 AND issued_on = ?3",
                params![origin, tier, day],
                |row| row.get::<_, Option<u32>>(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a ticket unless its (class, number, day) already exists.
///
/// The conditional insert is a single statement, so concurrent attempts on
/// the same number agree on exactly one winner. Returns the stored ticket,
/// or `None` when the number was already taken.
pub async fn insert_if_absent(
    db: &Database,
    ticket: NewTicket,
) -> Result<Option<Ticket>, GuicheError> {
    let origin = ticket.class.origin.to_string();
    let tier = ticket.class.tier.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO tickets (origin, tier, number, issued_on, issued_at, shift)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6
                 WHERE NOT EXISTS (
                     SELECT 1 FROM tickets
                     WHERE origin = ?1 AND tier = ?2 AND number = ?3 AND issued_on = ?4
                 )",
                params![
                    origin,
                    tier,
                    ticket.number,
                    ticket.issued_on,
                    ticket.issued_at,
                    ticket.shift.as_str()
                ],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(Ticket {
                id: conn.last_insert_rowid(),
                class: ticket.class,
                number: ticket.number,
                issued_on: ticket.issued_on,
                issued_at: ticket.issued_at,
                shift: ticket.shift,
                called: false,
                called_by: None,
                called_at: None,
                updated_at: None,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// How many numbers in `lo..=hi` already exist for the class on `day`.
pub async fn count_existing_in_span(
    db: &Database,
    class: QueueClass,
    lo: u32,
    hi: u32,
    day: &str,
) -> Result<u32, GuicheError> {
    let origin = class.origin.to_string();
    let tier = class.tier.to_string();
    let day = day.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM tickets
                 WHERE origin = ?1 AND tier = ?2 AND issued_on = ?3
                   AND number BETWEEN ?4 AND ?5",
                params![origin, tier, day, lo, hi],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert every absent number in `lo..=hi` inside one transaction.
///
/// Numbers that already exist are skipped, not overwritten. The whole span
/// commits or none of it does.
pub async fn insert_span(
    db: &Database,
    class: QueueClass,
    lo: u32,
    hi: u32,
    stamp: &IssueStamp,
) -> Result<SpanReport, GuicheError> {
    let origin = class.origin.to_string();
    let tier = class.tier.to_string();
    let stamp = stamp.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut issued = Vec::new();
            let mut skipped = 0u32;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO tickets (origin, tier, number, issued_on, issued_at, shift)
                     SELECT ?1, ?2, ?3, ?4, ?5, ?6
                     WHERE NOT EXISTS (
                         SELECT 1 FROM tickets
                         WHERE origin = ?1 AND tier = ?2 AND number = ?3 AND issued_on = ?4
                     )",
                )?;
                for number in lo..=hi {
                    let inserted = stmt.execute(params![
                        origin,
                        tier,
                        number,
                        stamp.day,
                        stamp.at,
                        stamp.shift.as_str()
                    ])?;
                    if inserted == 0 {
                        skipped += 1;
                    } else {
                        issued.push(Ticket {
                            id: tx.last_insert_rowid(),
                            class,
                            number,
                            issued_on: stamp.day.clone(),
                            issued_at: stamp.at.clone(),
                            shift: stamp.shift,
                            called: false,
                            called_by: None,
                            called_at: None,
                            updated_at: None,
                        });
                    }
                }
            }
            tx.commit()?;
            Ok(SpanReport { issued, skipped })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically take the next ticket to call for a class.
///
/// Selects the uncalled ticket issued on `day` with the smallest number
/// (ties broken by id, i.e. true issuance order) and marks it called by
/// `operator`, in one transaction. Returns `None` when the queue is empty.
pub async fn take_oldest_uncalled(
    db: &Database,
    class: QueueClass,
    day: &str,
    operator: &OperatorId,
    at: &str,
) -> Result<Option<Ticket>, GuicheError> {
    let origin = class.origin.to_string();
    let tier = class.tier.to_string();
    let day = day.to_string();
    let operator = operator.0.clone();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            // One transaction for find + mark, so a ticket is taken exactly once.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, origin, tier, number, issued_on, issued_at, shift,
                            called, called_by, called_at, updated_at
                     FROM tickets
                     WHERE origin = ?1 AND tier = ?2 AND issued_on = ?3 AND called = 0
                     ORDER BY number ASC, id ASC
                     LIMIT 1",
                )?;
                stmt.query_row(params![origin, tier, day], ticket_from_row)
            };

            match result {
                Ok(ticket) => {
                    tx.execute(
                        "UPDATE tickets
                         SET called = 1, called_by = ?1, called_at = ?2, updated_at = ?2
                         WHERE id = ?3",
                        params![operator, at, ticket.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(Ticket {
                        called: true,
                        called_by: Some(OperatorId(operator)),
                        called_at: Some(at.clone()),
                        updated_at: Some(at),
                        ..ticket
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The ticket most recently called by the operator, or `None` if the
/// operator has never called one.
pub async fn last_called_by(
    db: &Database,
    operator: &OperatorId,
) -> Result<Option<Ticket>, GuicheError> {
    let operator = operator.0.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, origin, tier, number, issued_on, issued_at, shift,
                        called, called_by, called_at, updated_at
                 FROM tickets
                 WHERE called_by = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![operator],
                ticket_from_row,
            );
            match result {
                Ok(ticket) => Ok(Some(ticket)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a ticket's `updated_at`. The only write a recall performs.
pub async fn touch(db: &Database, id: i64, at: &str) -> Result<(), GuicheError> {
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tickets SET updated_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Normal-tier issuance counts for the rate limiter: the whole day and the
/// given shift, optionally narrowed to one origin.
pub async fn normal_window(
    db: &Database,
    origin: Option<Origin>,
    day: &str,
    shift: Shift,
) -> Result<RateWindow, GuicheError> {
    let origin = origin.map(|o| o.to_string());
    let day = day.to_string();
    let shift = shift.as_str();
    db.connection()
        .call(move |conn| {
            let (day_count, shift_count) = match origin {
                Some(origin) => {
                    let day_count: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM tickets
                         WHERE tier = 'normal' AND issued_on = ?1 AND origin = ?2",
                        params![day, origin],
                        |row| row.get(0),
                    )?;
                    let shift_count: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM tickets
                         WHERE tier = 'normal' AND issued_on = ?1 AND origin = ?2
                           AND shift = ?3",
                        params![day, origin, shift],
                        |row| row.get(0),
                    )?;
                    (day_count, shift_count)
                }
                None => {
                    let day_count: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM tickets
                         WHERE tier = 'normal' AND issued_on = ?1",
                        params![day],
                        |row| row.get(0),
                    )?;
                    let shift_count: u64 = conn.query_row(
                        "SELECT COUNT(*) FROM tickets
                         WHERE tier = 'normal' AND issued_on = ?1 AND shift = ?2",
                        params![day, shift],
                        |row| row.get(0),
                    )?;
                    (day_count, shift_count)
                }
            };
            Ok(RateWindow { day_count, shift_count })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Uncalled tickets issued on `day`, grouped by class. Classes with no
/// pending rows do not appear.
pub async fn pending_counts(db: &Database, day: &str) -> Result<Vec<PendingCount>, GuicheError> {
    let day = day.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT origin, tier, COUNT(*)
                 FROM tickets
                 WHERE issued_on = ?1 AND called = 0
                 GROUP BY origin, tier
                 ORDER BY origin, tier",
            )?;
            let rows = stmt.query_map(params![day], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u64>(2)?,
                ))
            })?;

            let mut counts = Vec::new();
            for row in rows {
                let (origin, tier, pending) = row?;
                let class = QueueClass::new(
                    origin.parse().map_err(|e| column_decode(0, e))?,
                    tier.parse().map_err(|e| column_decode(1, e))?,
                );
                counts.push(PendingCount { class, pending });
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every ticket and reset the rowid sequence, so both per-class
/// numbering and arrival order restart from 1. Returns rows removed.
pub async fn purge_all(db: &Database) -> Result<u64, GuicheError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM tickets", [])?;
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'tickets'", [])?;
            tx.commit()?;
            Ok(removed as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn ticket_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let origin: String = row.get(1)?;
    let tier: String = row.get(2)?;
    let shift: String = row.get(6)?;
    let called_by: Option<String> = row.get(8)?;
    Ok(Ticket {
        id: row.get(0)?,
        class: QueueClass::new(
            origin.parse().map_err(|e| column_decode(1, e))?,
            tier.parse().map_err(|e| column_decode(2, e))?,
        ),
        number: row.get(3)?,
        issued_on: row.get(4)?,
        issued_at: row.get(5)?,
        shift: shift.parse().map_err(|e| column_decode(6, e))?,
        called: row.get(7)?,
        called_by: called_by.map(OperatorId),
        called_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Wraps an enum decode failure as a column conversion error.
fn column_decode(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use guiche_config::model::StorageConfig;
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let config = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let db = Database::open(&config).await.unwrap();
        (db, dir)
    }

    fn class(code: &str) -> QueueClass {
        QueueClass::from_code(code).unwrap()
    }

    fn stamp_at(hour: u32) -> IssueStamp {
        IssueStamp::capture(Local.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap())
    }

    async fn put(db: &Database, code: &str, number: u32, stamp: &IssueStamp) -> Ticket {
        insert_if_absent(db, NewTicket::new(class(code), number, stamp))
            .await
            .unwrap()
            .expect("number should be free")
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_class_number_day() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);

        let first = insert_if_absent(&db, NewTicket::new(class("EN"), 1, &stamp))
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(first.unwrap().id > 0);

        let second = insert_if_absent(&db, NewTicket::new(class("EN"), 1, &stamp))
            .await
            .unwrap();
        assert!(second.is_none());

        // Same number under a different class is a different key.
        let other_class = insert_if_absent(&db, NewTicket::new(class("EP"), 1, &stamp))
            .await
            .unwrap();
        assert!(other_class.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn max_number_is_scoped_to_class_and_day() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);

        assert_eq!(max_number(&db, class("EN"), &stamp.day).await.unwrap(), None);

        put(&db, "EN", 1, &stamp).await;
        put(&db, "EN", 2, &stamp).await;
        put(&db, "MP", 9, &stamp).await;

        assert_eq!(
            max_number(&db, class("EN"), &stamp.day).await.unwrap(),
            Some(2)
        );
        assert_eq!(max_number(&db, class("EP"), &stamp.day).await.unwrap(), None);
        assert_eq!(
            max_number(&db, class("EN"), "1999-01-01").await.unwrap(),
            None
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn span_insert_skips_existing_numbers() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);

        put(&db, "EN", 11, &stamp).await;

        let report = insert_span(&db, class("EN"), 10, 12, &stamp).await.unwrap();
        let numbers: Vec<u32> = report.issued.iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![10, 12]);
        assert_eq!(report.skipped, 1);

        // A fully covered span issues nothing and reports every skip.
        let report = insert_span(&db, class("EN"), 10, 12, &stamp).await.unwrap();
        assert!(report.issued.is_empty());
        assert_eq!(report.skipped, 3);

        assert_eq!(
            count_existing_in_span(&db, class("EN"), 10, 12, &stamp.day)
                .await
                .unwrap(),
            3
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn take_orders_by_number_not_insertion() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);
        let op = OperatorId("op1".into());

        // Insert out of order: 5 arrives before 2.
        put(&db, "EN", 5, &stamp).await;
        put(&db, "EN", 2, &stamp).await;
        put(&db, "EN", 3, &stamp).await;

        let first = take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.number, 2);
        assert!(first.called);
        assert_eq!(first.called_by, Some(op.clone()));
        assert_eq!(first.called_at.as_deref(), Some(stamp.at.as_str()));

        let second = take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.number, 3);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn take_ignores_other_days_and_classes() {
        let (db, _dir) = setup_db().await;
        let today = stamp_at(9);
        let op = OperatorId("op1".into());

        let yesterday = IssueStamp::capture(
            Local.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        );
        put(&db, "EN", 1, &yesterday).await;
        put(&db, "EP", 1, &today).await;

        let taken = take_oldest_uncalled(&db, class("EN"), &today.day, &op, &today.at)
            .await
            .unwrap();
        assert!(taken.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_takes_never_share_a_ticket() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);

        for number in 1..=6 {
            put(&db, "EN", number, &stamp).await;
        }

        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for i in 0..6 {
            let db = db.clone();
            let stamp = stamp.clone();
            handles.push(tokio::spawn(async move {
                let op = OperatorId(format!("op-{i}"));
                take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at).await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            let ticket = handle.await.unwrap().unwrap().expect("queue not empty");
            numbers.push(ticket.number);
        }
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);

        // All taken: the next take sees an empty queue.
        let op = OperatorId("op-extra".into());
        let empty = take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap();
        assert!(empty.is_none());

        std::sync::Arc::into_inner(db)
            .expect("all tasks joined")
            .close()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn last_called_returns_most_recent_and_touch_updates() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);
        let op = OperatorId("op1".into());

        put(&db, "EN", 1, &stamp).await;
        put(&db, "EN", 2, &stamp).await;

        take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap();
        let second = take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap()
            .unwrap();

        let last = last_called_by(&db, &op).await.unwrap().unwrap();
        assert_eq!(last.id, second.id);
        assert_eq!(last.number, 2);

        touch(&db, last.id, "2026-03-02T10:00:00-03:00").await.unwrap();
        let touched = last_called_by(&db, &op).await.unwrap().unwrap();
        assert_eq!(touched.updated_at.as_deref(), Some("2026-03-02T10:00:00-03:00"));
        // The call state itself is untouched.
        assert!(touched.called);
        assert_eq!(touched.called_at, last.called_at);

        let nobody = last_called_by(&db, &OperatorId("ghost".into())).await.unwrap();
        assert!(nobody.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn normal_window_counts_tier_day_shift_and_origin() {
        let (db, _dir) = setup_db().await;
        let am = stamp_at(9);
        let pm = stamp_at(14);

        put(&db, "EN", 1, &am).await;
        put(&db, "EN", 2, &am).await;
        put(&db, "EN", 3, &pm).await;
        put(&db, "MN", 1, &am).await;
        // Priority tickets never count against the caps.
        put(&db, "EP", 1, &am).await;

        let global = normal_window(&db, None, &am.day, Shift::Morning).await.unwrap();
        assert_eq!(global.day_count, 4);
        assert_eq!(global.shift_count, 3);

        let pm_window = normal_window(&db, None, &am.day, Shift::Afternoon).await.unwrap();
        assert_eq!(pm_window.day_count, 4);
        assert_eq!(pm_window.shift_count, 1);

        let estadual = normal_window(&db, Some(Origin::Estadual), &am.day, Shift::Morning)
            .await
            .unwrap();
        assert_eq!(estadual.day_count, 3);
        assert_eq!(estadual.shift_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pending_counts_groups_uncalled_by_class() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);
        let op = OperatorId("op1".into());

        put(&db, "EN", 1, &stamp).await;
        put(&db, "EN", 2, &stamp).await;
        put(&db, "MP", 1, &stamp).await;

        take_oldest_uncalled(&db, class("EN"), &stamp.day, &op, &stamp.at)
            .await
            .unwrap();

        let counts = pending_counts(&db, &stamp.day).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&PendingCount { class: class("EN"), pending: 1 }));
        assert!(counts.contains(&PendingCount { class: class("MP"), pending: 1 }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_rows_and_restarts_ids() {
        let (db, _dir) = setup_db().await;
        let stamp = stamp_at(9);

        put(&db, "EN", 1, &stamp).await;
        put(&db, "EN", 2, &stamp).await;
        put(&db, "EP", 1, &stamp).await;

        let removed = purge_all(&db).await.unwrap();
        assert_eq!(removed, 3);

        assert_eq!(max_number(&db, class("EN"), &stamp.day).await.unwrap(), None);

        // The rowid sequence restarts too, so arrival order is fresh.
        let fresh = put(&db, "EN", 1, &stamp).await;
        assert_eq!(fresh.id, 1);

        db.close().await.unwrap();
    }
}
