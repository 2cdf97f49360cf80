//! Broadcast channel for committed audit entries.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The transition
//! engine publishes every [`AuditLogEntry`] after it commits, and WebSocket
//! connections (the notification feed) subscribe to receive them.

use tokio::sync::broadcast;

use super::AuditLogEntry;

/// Broadcast bus for committed [`AuditLogEntry`] values.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest entries are
/// dropped for lagging receivers. The audit log itself stays authoritative.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuditLogEntry>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an entry to all subscribers.
    ///
    /// Returns the number of receivers that received it. Without active
    /// receivers the entry is silently dropped.
    pub fn publish(&self, entry: AuditLogEntry) -> usize {
        self.sender.send(entry).unwrap_or(0)
    }

    /// Creates a new receiver for all future entries.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditLogEntry> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
