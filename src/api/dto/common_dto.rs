//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Upper bound for any `limit` query parameter.
pub const MAX_LIMIT: u32 = 500;

fn default_limit() -> u32 {
    50
}

/// `limit` query parameter shared by the feed endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct LimitParams {
    /// Maximum number of rows (1..=500). Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl LimitParams {
    /// Returns the limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamped(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT) as usize
    }
}

/// Keyset pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CursorMeta {
    /// Rows requested per page.
    pub limit: u32,
    /// Pass as `after` to fetch the next page; absent on the last page.
    pub next_cursor: Option<uuid::Uuid>,
}
