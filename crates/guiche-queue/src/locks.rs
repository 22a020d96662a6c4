// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(class, day) allocation locks.
//!
//! Sequential numbering needs its read-max -> insert window to be mutually
//! exclusive within one class and day. The locks are keyed so different
//! classes (and different days) never contend with each other.

use std::sync::Arc;

use dashmap::DashMap;
use guiche_core::types::QueueClass;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by (class, day).
///
/// `acquire` hands back an owned guard so the critical section can span
/// ledger awaits. Slots for days other than the one being acquired are
/// pruned on each acquire, so the map never accumulates entries across
/// day boundaries.
#[derive(Default)]
pub struct KeyedLocks {
    slots: DashMap<(QueueClass, String), Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self { slots: DashMap::new() }
    }

    /// Locks the (class, day) slot, creating it on first use.
    ///
    /// Waiters queue on the async mutex; nothing spins. A guard held for a
    /// stale day stays valid even after its slot is pruned, because the
    /// guard owns the underlying `Arc`.
    pub async fn acquire(&self, class: QueueClass, day: &str) -> OwnedMutexGuard<()> {
        self.slots.retain(|(_, slot_day), _| slot_day == day);
        let slot = self
            .slots
            .entry((class, day.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        slot.lock_owned().await
    }

    /// Number of live slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use guiche_core::types::{Origin, Tier};

    use super::*;

    fn class(code: (Origin, Tier)) -> QueueClass {
        QueueClass::new(code.0, code.1)
    }

    #[tokio::test]
    async fn same_slot_is_mutually_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let en = class((Origin::Estadual, Tier::Normal));

        let guard = locks.acquire(en, "2026-03-02").await;

        let contender_locks = Arc::clone(&locks);
        let contender =
            tokio::spawn(async move { contender_locks.acquire(en, "2026-03-02").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished(), "second acquire should block");

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_classes_do_not_contend() {
        let locks = KeyedLocks::new();
        let _held = locks
            .acquire(class((Origin::Estadual, Tier::Normal)), "2026-03-02")
            .await;

        let other = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(class((Origin::Municipal, Tier::Normal)), "2026-03-02"),
        )
        .await;
        assert!(other.is_ok(), "other class should acquire immediately");
    }

    #[tokio::test]
    async fn different_days_do_not_contend() {
        let locks = KeyedLocks::new();
        let _held = locks
            .acquire(class((Origin::Estadual, Tier::Normal)), "2026-03-02")
            .await;

        let next_day = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(class((Origin::Estadual, Tier::Normal)), "2026-03-03"),
        )
        .await;
        assert!(next_day.is_ok(), "new day should acquire immediately");
    }

    #[tokio::test]
    async fn stale_days_are_pruned_on_acquire() {
        let locks = KeyedLocks::new();
        let en = class((Origin::Estadual, Tier::Normal));
        let ep = class((Origin::Estadual, Tier::Priority));

        drop(locks.acquire(en, "2026-03-02").await);
        drop(locks.acquire(ep, "2026-03-02").await);
        assert_eq!(locks.slot_count(), 2);

        drop(locks.acquire(en, "2026-03-03").await);
        assert_eq!(locks.slot_count(), 1, "previous day's slots should be gone");
    }
}
