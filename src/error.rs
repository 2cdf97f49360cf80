//! Lifecycle error types with HTTP status code mapping.
//!
//! [`LifecycleError`] is the central error type of the crate. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AccountId, AccountStatus, ActionType};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "account ... changed concurrently ...",
///     "details": "reload and retry"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`LifecycleError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional hint for the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error enum shared by stores, services and handlers.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                  |
/// |-----------|-----------------------|------------------------------|
/// | 1000–1999 | Validation / Auth     | 400 Bad Request / 403        |
/// | 2000–2999 | Not Found / Conflict  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server                | 500 Internal Server Error    |
/// | 4000–4999 | Lifecycle rules       | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// No account with the given id.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The requested edge is not legal from the account's current status.
    #[error("cannot {action} account {account_id} while it is {status}")]
    InvalidTransition {
        /// Target account.
        account_id: AccountId,
        /// Status at the time of the attempt.
        status: AccountStatus,
        /// Attempted action.
        action: ActionType,
    },

    /// Lost a compare-and-set race; nothing was written.
    #[error("account {account_id} changed concurrently (expected it {expected})")]
    Conflict {
        /// Target account.
        account_id: AccountId,
        /// Status the caller based its decision on.
        expected: AccountStatus,
    },

    /// Malformed input, rejected before any state was touched.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Caller lacks administrator privilege.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Storage backend failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Forbidden(_) => 1003,
            Self::AccountNotFound(_) => 2001,
            Self::Conflict { .. } => 2002,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
            Self::InvalidTransition { .. } => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Hint telling a UI how to recover.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some("reload and retry"),
            Self::Validation(_) => Some("fix the request and resubmit"),
            _ => None,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.hint().map(str::to_string),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
