//! Dashboard and audit feed handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration;

use crate::api::dto::{ExpiringParams, LimitParams, StatsParams};
use crate::app_state::AppState;
use crate::domain::{Account, AuditLogEntry};
use crate::error::{ErrorResponse, LifecycleError};
use crate::service::reporting::DEFAULT_EXPIRING_WINDOW_HOURS;
use crate::service::{DashboardStats, PendingDeletion};

/// Longest look-ahead accepted by the dashboard, in hours.
const MAX_WINDOW_HOURS: i64 = 24 * 365;

fn window(hours: Option<i64>) -> Result<Duration, LifecycleError> {
    let hours = hours.unwrap_or(DEFAULT_EXPIRING_WINDOW_HOURS);
    if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(LifecycleError::Validation(format!(
            "window must be between 1 and {MAX_WINDOW_HOURS} hours, got {hours}"
        )));
    }
    Ok(Duration::hours(hours))
}

/// `GET /dashboard/stats` — Aggregate counts.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] for an out-of-range window.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    tag = "Dashboard",
    summary = "Dashboard statistics",
    description = "Counts per status, accounts in final notice, trials expiring inside the window and signups since midnight UTC.",
    params(StatsParams),
    responses(
        (status = 200, description = "Aggregate statistics", body = DashboardStats),
        (status = 400, description = "Invalid window", body = ErrorResponse),
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, LifecycleError> {
    let window = window(params.expiring_within_hours)?;
    let stats = state.reporting.stats(window).await?;
    Ok(Json(stats))
}

/// `GET /dashboard/expiring-trials` — Trials ending soon.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] for an out-of-range window.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/expiring-trials",
    tag = "Dashboard",
    summary = "Trials expiring soon",
    description = "Running trials whose end falls inside the window, soonest first.",
    params(ExpiringParams),
    responses(
        (status = 200, description = "Expiring trials", body = Vec<Account>),
        (status = 400, description = "Invalid window", body = ErrorResponse),
    )
)]
pub async fn expiring_trials(
    State(state): State<AppState>,
    Query(params): Query<ExpiringParams>,
) -> Result<impl IntoResponse, LifecycleError> {
    let window = window(params.within_hours)?;
    let trials = state.reporting.trials_expiring_within(window).await?;
    Ok(Json(trials))
}

/// `GET /dashboard/pending-deletions` — Accounts with a deletion deadline.
///
/// # Errors
///
/// Returns [`LifecycleError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/pending-deletions",
    tag = "Dashboard",
    summary = "Pending deletions",
    description = "Every account with a scheduled deletion, soonest first.",
    responses(
        (status = 200, description = "Pending deletions", body = Vec<PendingDeletion>),
    )
)]
pub async fn pending_deletions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LifecycleError> {
    let pending = state.reporting.pending_deletions().await?;
    Ok(Json(pending))
}

/// `GET /audit` — Latest audit entries across all accounts.
///
/// # Errors
///
/// Returns [`LifecycleError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    tag = "Dashboard",
    summary = "Recent audit entries",
    description = "Newest audit entries first, system and administrator actions alike.",
    params(LimitParams),
    responses(
        (status = 200, description = "Recent audit entries", body = Vec<AuditLogEntry>),
    )
)]
pub async fn recent_audit(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<impl IntoResponse, LifecycleError> {
    let entries = state.reporting.recent_audit(params.clamped()).await?;
    Ok(Json(entries))
}

/// Dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/expiring-trials", get(expiring_trials))
        .route("/dashboard/pending-deletions", get(pending_deletions))
        .route("/audit", get(recent_audit))
}
