//! Account DTOs for signup, listing and detail.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{CursorMeta, MAX_LIMIT};
use crate::domain::{Account, AccountStatus};

/// Request body for `POST /accounts`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Id issued by the identity provider; generated when absent.
    #[serde(default)]
    pub account_id: Option<uuid::Uuid>,
}

fn default_page_limit() -> u32 {
    20
}

/// Query parameters for `GET /accounts`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListAccountsParams {
    /// Status to list.
    pub status: AccountStatus,
    /// Return accounts with ids greater than this cursor.
    #[serde(default)]
    pub after: Option<uuid::Uuid>,
    /// Page size (1..=500). Defaults to 20.
    #[serde(default = "default_page_limit")]
    pub limit: u32,
}

impl ListAccountsParams {
    /// Page size clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Paginated list response for `GET /accounts`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountListResponse {
    /// Accounts in id order.
    pub data: Vec<Account>,
    /// Cursor for the following page.
    pub pagination: CursorMeta,
}

/// Query parameters for `GET /dashboard/stats`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StatsParams {
    /// Look-ahead for "trials expiring soon", in hours. Defaults to 24.
    #[serde(default)]
    pub expiring_within_hours: Option<i64>,
}

/// Query parameters for `GET /dashboard/expiring-trials`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExpiringParams {
    /// Window in hours. Defaults to 24.
    #[serde(default)]
    pub within_hours: Option<i64>,
}
