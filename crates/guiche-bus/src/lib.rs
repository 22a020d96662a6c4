// SPDX-FileCopyrightText: 2026 Guiche Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast bus for ticket call announcements.
//!
//! Every successful call or recall produces a [`CallEnvelope`] that is fanned
//! out to all connected consumers (wall displays, WebSocket sessions). A
//! recall re-emits an envelope identical in payload to a fresh call; displays
//! treat both the same way.
//!
//! Built on `tokio::sync::broadcast`: publishing never blocks, and slow
//! receivers that fall behind get a `Lagged` error and miss announcements.
//! For a waiting-room display freshness matters more than completeness.

use chrono::{DateTime, Utc};
use guiche_core::types::CallEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Topic name carried by every announcement envelope.
pub const CALL_TOPIC: &str = "ticketCalled";

/// Self-describing wrapper around a [`CallEvent`].
///
/// The envelope carries metadata (event ID, emission timestamp, topic) while
/// the `event` field holds the display payload. Consumers that only care
/// about the panel content can read `event` and ignore the rest.
#[derive(Debug, Clone, Serialize)]
pub struct CallEnvelope {
    /// Unique identifier for this emission. A recall gets a fresh ID even
    /// though its payload matches the original call.
    pub event_id: Uuid,
    /// When the announcement was emitted (UTC).
    pub emitted_at: DateTime<Utc>,
    /// Always [`CALL_TOPIC`].
    pub topic: String,
    /// What the displays render.
    pub event: CallEvent,
}

impl CallEnvelope {
    /// Wrap a call event in a fresh envelope.
    pub fn new(event: CallEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            topic: CALL_TOPIC.to_string(),
            event,
        }
    }
}

/// Broadcast-based bus distributing call announcements to multiple consumers.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. If there
/// are no active subscribers an announcement is silently dropped.
pub struct TicketBus {
    tx: broadcast::Sender<CallEnvelope>,
}

impl TicketBus {
    /// Create a new bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a call announcement to all subscribers.
    pub fn publish(&self, event: CallEvent) {
        let envelope = CallEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            class = %envelope.event.class,
            number = envelope.event.number,
            event_id = %envelope.event_id,
            subscriber_count,
            "announcement published"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to announcements. Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<CallEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
