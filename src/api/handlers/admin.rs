//! Administrative override handlers.
//!
//! Every command requires the `x-admin-id` header and a `reason`. The
//! response is the committed account.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::AdminIdentity;
use crate::api::dto::{ExtensionRequest, ReasonRequest};
use crate::app_state::AppState;
use crate::domain::{Account, AccountId};
use crate::error::{ErrorResponse, LifecycleError};

/// `POST /accounts/{id}/extend-trial` — Push the trial end forward.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/extend-trial",
    tag = "Admin",
    summary = "Extend a running trial",
    description = "Adds `days` to the current trial end. Only legal while the trial is running.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ExtensionRequest,
    responses(
        (status = 200, description = "Trial extended", body = Account),
        (status = 400, description = "Invalid days or reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "Account is not in trial", body = ErrorResponse),
    )
)]
pub async fn extend_trial(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ExtensionRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let (days, reason) = req.validate()?;
    let account = state
        .commands
        .extend_trial(&admin, AccountId::from(id), days, &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/activate-premium` — Grant premium access.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/activate-premium",
    tag = "Admin",
    summary = "Activate premium",
    description = "Moves a trial, expired, cancelled or final-notice account to `premium_active` and clears any scheduled deletion.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Premium activated", body = Account),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "Illegal from the current status", body = ErrorResponse),
    )
)]
pub async fn activate_premium(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let reason = req.validate()?;
    let account = state
        .commands
        .activate_premium(&admin, AccountId::from(id), &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/deactivate-premium` — End a subscription.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/deactivate-premium",
    tag = "Admin",
    summary = "Deactivate premium",
    description = "Moves a premium account to `premium_cancelled` and schedules deletion after the grace window.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Premium deactivated", body = Account),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "Account is not premium", body = ErrorResponse),
    )
)]
pub async fn deactivate_premium(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let reason = req.validate()?;
    let account = state
        .commands
        .deactivate_premium(&admin, AccountId::from(id), &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/cancel-deletion` — Keep an account indefinitely.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/cancel-deletion",
    tag = "Admin",
    summary = "Cancel scheduled deletion",
    description = "Clears the deletion deadline. A final-notice account returns to the status it held before entering `grace_period`.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Deletion cancelled", body = Account),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "No deletion is scheduled", body = ErrorResponse),
    )
)]
pub async fn cancel_deletion(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let reason = req.validate()?;
    let account = state
        .commands
        .cancel_deletion(&admin, AccountId::from(id), &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/extend-grace-period` — Postpone deletion.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/extend-grace-period",
    tag = "Admin",
    summary = "Extend the grace period",
    description = "Adds `days` to the deletion deadline of an account with a scheduled deletion. The status does not change.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ExtensionRequest,
    responses(
        (status = 200, description = "Grace period extended", body = Account),
        (status = 400, description = "Invalid days or reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "No deletion is scheduled", body = ErrorResponse),
    )
)]
pub async fn extend_grace_period(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ExtensionRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let (days, reason) = req.validate()?;
    let account = state
        .commands
        .extend_grace_period(&admin, AccountId::from(id), days, &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/suspend` — Block an account.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/suspend",
    tag = "Admin",
    summary = "Suspend an account",
    description = "Blocks all access. Trial and grace deadlines are frozen until the account is reinstated.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Account suspended", body = Account),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "Already suspended or deleted", body = ErrorResponse),
    )
)]
pub async fn suspend(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let reason = req.validate()?;
    let account = state
        .commands
        .suspend(&admin, AccountId::from(id), &reason)
        .await?;
    Ok(Json(account))
}

/// `POST /accounts/{id}/reinstate` — Lift a suspension.
///
/// # Errors
///
/// Returns [`LifecycleError`] on validation, privilege, state or conflict
/// failures.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/reinstate",
    tag = "Admin",
    summary = "Reinstate a suspended account",
    description = "Restores the status held before suspension.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
        ("x-admin-id" = String, Header, description = "Authenticated operator id"),
    ),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Account reinstated", body = Account),
        (status = 400, description = "Missing reason", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Concurrent change", body = ErrorResponse),
        (status = 422, description = "Account is not suspended", body = ErrorResponse),
    )
)]
pub async fn reinstate(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let reason = req.validate()?;
    let account = state
        .commands
        .reinstate(&admin, AccountId::from(id), &reason)
        .await?;
    Ok(Json(account))
}

/// Administrative command routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{id}/extend-trial", post(extend_trial))
        .route("/accounts/{id}/activate-premium", post(activate_premium))
        .route("/accounts/{id}/deactivate-premium", post(deactivate_premium))
        .route("/accounts/{id}/cancel-deletion", post(cancel_deletion))
        .route("/accounts/{id}/extend-grace-period", post(extend_grace_period))
        .route("/accounts/{id}/suspend", post(suspend))
        .route("/accounts/{id}/reinstate", post(reinstate))
}
