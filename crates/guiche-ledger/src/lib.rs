// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite ticket ledger for the Guiche ticket service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and the atomic
//! ticket operations the queue core builds on: conditional inserts keyed
//! by (class, number, day), fused select-and-mark call selection, rate
//! window counts, and the full purge.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteLedger;
pub use database::Database;
