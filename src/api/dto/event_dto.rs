//! Event ledger DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::common_dto::MAX_LIMIT;
use crate::domain::EventSourceFilter;

/// Request body for `POST /accounts/{id}/events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordEventRequest {
    /// Free-form label, e.g. `payment_failed`.
    pub event_type: String,
    /// Correlation id from the payment processor; omit for manual entries.
    #[serde(default)]
    pub external_reference: Option<String>,
    /// Arbitrary JSON object kept for reconciliation.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

fn default_limit() -> u32 {
    50
}

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RecentEventsParams {
    /// `all`, `processor` or `manual`.
    #[serde(default)]
    pub source: EventSourceFilter,
    /// Maximum number of rows (1..=500). Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl RecentEventsParams {
    /// Limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT) as usize
    }
}
