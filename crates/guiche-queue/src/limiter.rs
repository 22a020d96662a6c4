// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normal-tier rate caps.
//!
//! Two ceilings apply to Normal-tier issuance: a daily cap over the whole
//! local day and a shift cap over the current half-day (before/after local
//! noon). Priority tickets are never rate limited. The limiter emits a
//! `tracing::warn` once a window passes 80% of a cap and rejects with
//! `GuicheError::CapacityExceeded` when a cap would be exceeded.

use guiche_core::error::GuicheError;
use guiche_core::traits::TicketLedger;
use guiche_core::types::{CapKind, IssueStamp, QueueClass, RateScope, RateWindow, Shift, Tier};
use tracing::warn;

/// Stateless cap enforcement; counts are read from the ledger per check.
///
/// Reading counts from the ledger instead of keeping in-memory totals means
/// enforcement survives restarts for free and manual/range inserts are
/// counted no matter which code path created them.
pub struct RateLimiter {
    daily_cap: u32,
    shift_cap: u32,
    scope: RateScope,
}

impl RateLimiter {
    pub fn new(daily_cap: u32, shift_cap: u32, scope: RateScope) -> Self {
        Self { daily_cap, shift_cap, scope }
    }

    /// Admit `qty` new Normal-tier tickets for the stamp's day and shift,
    /// or reject with the first exceeded cap (daily checked before shift).
    ///
    /// Priority-tier classes and zero quantities pass without a ledger read.
    pub async fn admit(
        &self,
        ledger: &dyn TicketLedger,
        class: QueueClass,
        qty: u32,
        stamp: &IssueStamp,
    ) -> Result<(), GuicheError> {
        if class.tier != Tier::Normal || qty == 0 {
            return Ok(());
        }
        let origin = match self.scope {
            RateScope::Global => None,
            RateScope::PerOrigin => Some(class.origin),
        };
        let window = ledger.normal_window(origin, &stamp.day, stamp.shift).await?;
        self.check(window, qty, stamp.shift)
    }

    /// Pure cap check against an already-read window.
    pub fn check(&self, window: RateWindow, qty: u32, shift: Shift) -> Result<(), GuicheError> {
        let qty = u64::from(qty);

        if window.day_count + qty > u64::from(self.daily_cap) {
            return Err(GuicheError::CapacityExceeded {
                kind: CapKind::Daily,
                cap: self.daily_cap,
                counted: window.day_count,
                requested: qty as u32,
            });
        }
        if window.shift_count + qty > u64::from(self.shift_cap) {
            return Err(GuicheError::CapacityExceeded {
                kind: CapKind::shift(shift),
                cap: self.shift_cap,
                counted: window.shift_count,
                requested: qty as u32,
            });
        }

        if (window.day_count + qty) * 5 >= u64::from(self.daily_cap) * 4 {
            warn!(
                day_count = window.day_count + qty,
                daily_cap = self.daily_cap,
                "approaching daily ticket cap (80%+)"
            );
        }
        if (window.shift_count + qty) * 5 >= u64::from(self.shift_cap) * 4 {
            warn!(
                shift_count = window.shift_count + qty,
                shift_cap = self.shift_cap,
                shift = shift.as_str(),
                "approaching shift ticket cap (80%+)"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(daily: u32, shift: u32) -> RateLimiter {
        RateLimiter::new(daily, shift, RateScope::Global)
    }

    fn window(day: u64, shift: u64) -> RateWindow {
        RateWindow { day_count: day, shift_count: shift }
    }

    #[test]
    fn under_both_caps_admits() {
        let result = limiter(400, 200).check(window(100, 50), 10, Shift::Morning);
        assert!(result.is_ok());
    }

    #[test]
    fn filling_a_cap_exactly_admits() {
        // 399 issued + 1 = 400 = cap: allowed. 400 + 1 would exceed.
        assert!(limiter(400, 400).check(window(399, 0), 1, Shift::Morning).is_ok());
        assert!(limiter(400, 400).check(window(400, 0), 1, Shift::Morning).is_err());
    }

    #[test]
    fn daily_cap_rejection_names_the_ceiling() {
        let err = limiter(400, 200)
            .check(window(395, 100), 10, Shift::Morning)
            .unwrap_err();
        match err {
            GuicheError::CapacityExceeded { kind, cap, counted, requested } => {
                assert_eq!(kind, CapKind::Daily);
                assert_eq!(cap, 400);
                assert_eq!(counted, 395);
                assert_eq!(requested, 10);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn shift_cap_rejection_names_the_shift() {
        let err = limiter(400, 200)
            .check(window(250, 198), 5, Shift::Afternoon)
            .unwrap_err();
        match err {
            GuicheError::CapacityExceeded { kind, cap, counted, .. } => {
                assert_eq!(kind, CapKind::AfternoonShift);
                assert_eq!(cap, 200);
                assert_eq!(counted, 198);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn daily_cap_is_checked_before_shift_cap() {
        // Both would be exceeded; the daily cap is the one reported.
        let err = limiter(10, 5).check(window(10, 5), 1, Shift::Morning).unwrap_err();
        assert!(matches!(
            err,
            GuicheError::CapacityExceeded { kind: CapKind::Daily, .. }
        ));
    }

    #[test]
    fn batch_quantity_counts_in_full() {
        // 390 issued, 11 requested, cap 400: the whole batch is rejected.
        let err = limiter(400, 400).check(window(390, 0), 11, Shift::Morning).unwrap_err();
        assert!(matches!(err, GuicheError::CapacityExceeded { .. }));
    }

    #[test]
    fn near_cap_still_admits() {
        // 80%+ emits a warning but does not reject.
        assert!(limiter(100, 100).check(window(85, 85), 1, Shift::Morning).is_ok());
    }
}
