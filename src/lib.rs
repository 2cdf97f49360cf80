//! # account-lifecycle
//!
//! Account lifecycle engine for subscription products: free trials, premium
//! activation and cancellation, grace periods before deletion, and
//! administrator overrides that always leave an audit trail.
//!
//! Every status change goes through the [`service::TransitionEngine`], which
//! writes the account and its audit entry in one unit with a compare-and-set
//! on `(status, version)`. Time-based edges are applied by the
//! [`service::Scheduler`]; privileged edges by [`service::AdminCommands`].
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── AdminCommands ─┐
//!     ├── Scheduler ─────┼── TransitionEngine (service/)
//!     ├── ReportingService, EventRecorder
//!     ├── EventBus (domain/)
//!     │
//!     └── AccountStore / AuditLogReader / EventLedger (persistence/)
//!             ├── InMemoryStore
//!             └── PostgresStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
