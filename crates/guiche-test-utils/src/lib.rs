// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Guiche integration tests.
//!
//! Provides a mock receipt sink and a harness that assembles a complete
//! ticket service over a temp SQLite database, for fast, deterministic,
//! CI-runnable tests without printers or real clocks.
//!
//! # Components
//!
//! - [`MockReceipts`] - Recording receipt sink with sequential claim tokens
//! - [`CounterHarness`] - Full service stack with temp ledger and pinned clock

pub mod harness;
pub mod mock_receipts;

pub use harness::CounterHarness;
pub use mock_receipts::MockReceipts;
