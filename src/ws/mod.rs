//! WebSocket layer: connection handling and subscriptions.
//!
//! The endpoint at `/ws` streams committed audit entries to collaborators
//! such as the notification sender. Clients choose which accounts and
//! actions they receive.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
