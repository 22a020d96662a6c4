// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue engine for the Guiche ticket service.
//!
//! The [`TicketService`] facade is the single entry point that:
//! - Issues dense per-class ticket sequences, restarting each day
//! - Records manual numbers and backfills ranges idempotently
//! - Calls and re-announces tickets in strict FIFO order per class
//! - Enforces daily and shift caps on Normal-tier issuance
//! - Publishes every call on the announcement bus
//!
//! The pieces compose bottom-up: [`locks::KeyedLocks`] serializes issuance
//! per (class, day), [`limiter::RateLimiter`] gates Normal-tier volume,
//! [`allocator::Allocator`] owns numbering, and [`dispatcher::Dispatcher`]
//! owns the call flow.

pub mod allocator;
pub mod dispatcher;
pub mod limiter;
pub mod locks;
pub mod service;

pub use allocator::Allocator;
pub use dispatcher::Dispatcher;
pub use limiter::RateLimiter;
pub use locks::KeyedLocks;
pub use service::{QueueSettings, TicketService};
