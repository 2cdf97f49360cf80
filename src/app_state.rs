//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{AdminCommands, EventRecorder, ReportingService, TransitionEngine};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Transition engine, used directly for signup.
    pub engine: Arc<TransitionEngine>,
    /// Privileged commands.
    pub commands: Arc<AdminCommands>,
    /// Read-side queries.
    pub reporting: Arc<ReportingService>,
    /// Ledger ingestion.
    pub recorder: Arc<EventRecorder>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
