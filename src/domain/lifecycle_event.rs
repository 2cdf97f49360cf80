//! Event ledger rows.
//!
//! A [`LifecycleEvent`] records an inbound notification (payment processor
//! webhook or a manually recorded action). Ledger rows are for display and
//! reconciliation; they never change account status by themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AccountId;

/// Origin of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Carries an external correlation id from the payment processor.
    Processor,
    /// Recorded by hand, no external reference.
    Manual,
}

/// Filter applied to ledger listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventSourceFilter {
    /// No filtering.
    #[default]
    All,
    /// Only processor-originated events.
    Processor,
    /// Only manually recorded events.
    Manual,
}

impl EventSourceFilter {
    /// Returns `true` if `event` passes the filter.
    #[must_use]
    pub fn matches(self, event: &LifecycleEvent) -> bool {
        match self {
            Self::All => true,
            Self::Processor => event.source() == EventSource::Processor,
            Self::Manual => event.source() == EventSource::Manual,
        }
    }
}

/// Append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LifecycleEvent {
    /// Event id.
    pub id: uuid::Uuid,
    /// Account the notification concerns.
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    /// Free-form label, e.g. `payment_succeeded`.
    pub event_type: String,
    /// Correlation id from the originating system, if any.
    pub external_reference: Option<String>,
    /// Raw payload details kept for reconciliation.
    pub metadata: serde_json::Value,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

impl LifecycleEvent {
    /// Builds a new event with a fresh id.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        event_type: impl Into<String>,
        external_reference: Option<String>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            account_id,
            event_type: event_type.into(),
            external_reference,
            metadata,
            created_at,
        }
    }

    /// Classifies the event by the presence of an external reference.
    #[must_use]
    pub fn source(&self) -> EventSource {
        match self.external_reference.as_deref() {
            Some(reference) if !reference.is_empty() => EventSource::Processor,
            _ => EventSource::Manual,
        }
    }
}
