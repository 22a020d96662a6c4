// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock abstraction.
//!
//! Day boundaries, shift boundaries, and timestamps all derive from a
//! [`Clock`] so tests can pin or advance time deterministically.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock pinned to a settable instant, for tests that cross day or
/// shift boundaries.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self { instant: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.instant.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.instant.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn fixed_clock_returns_and_advances() {
        let start = Local.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        let later = Local.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
