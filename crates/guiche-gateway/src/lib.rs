// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Guiche ticket service.
//!
//! Serves three surfaces from one axum router:
//! - the counter REST API (`/v1/...`) used by issuing kiosks and operator
//!   consoles
//! - the one-shot receipt claim route backing printed tickets
//! - the `/ws` feed that pushes call announcements to wall displays
//!
//! The router is pure over [`AppState`], so tests drive it directly with
//! `tower::ServiceExt::oneshot` and the binary mounts it behind
//! [`server::serve`].

pub mod handlers;
pub mod printjobs;
pub mod server;
pub mod ws;

pub use printjobs::PrintJobStore;
pub use server::{router, serve, AppState};
