//! Account handlers: signup, listing, detail and access summary.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{AccountListResponse, CreateAccountRequest, CursorMeta, ListAccountsParams};
use crate::app_state::AppState;
use crate::domain::{Account, AccountId};
use crate::error::{ErrorResponse, LifecycleError};
use crate::persistence::PageRequest;
use crate::service::{AccessSummary, AccountDetail};

/// `POST /accounts` — Start a trial for a newly registered user.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] if the id is already registered.
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "Accounts",
    summary = "Create a trial account",
    description = "Registers an account in `trial_active`. The trial window starts now and its length comes from `TRIAL_DAYS`. An id issued by the identity provider may be supplied; otherwise one is generated.",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Id already registered", body = ErrorResponse),
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    body: Option<Json<CreateAccountRequest>>,
) -> Result<impl IntoResponse, LifecycleError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let account_id = req.account_id.map(AccountId::from).unwrap_or_default();
    let account = state.engine.start_trial(account_id).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /accounts` — Page through accounts in one status.
///
/// # Errors
///
/// Returns [`LifecycleError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "Accounts",
    summary = "List accounts by status",
    description = "Returns accounts in the given status ordered by id. Pass the returned `next_cursor` as `after` to fetch the next page.",
    params(ListAccountsParams),
    responses(
        (status = 200, description = "One page of accounts", body = AccountListResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<ListAccountsParams>,
) -> Result<impl IntoResponse, LifecycleError> {
    let limit = params.clamped_limit();
    let page = state
        .reporting
        .list_accounts(
            params.status,
            PageRequest {
                after: params.after.map(AccountId::from),
                limit: limit as usize,
            },
        )
        .await?;

    Ok(Json(AccountListResponse {
        data: page.items,
        pagination: CursorMeta {
            limit,
            next_cursor: page.next_cursor.map(uuid::Uuid::from),
        },
    }))
}

/// `GET /accounts/{id}` — Account with its audit trail and ledger events.
///
/// # Errors
///
/// Returns [`LifecycleError::AccountNotFound`] if the account does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    tag = "Accounts",
    summary = "Get account detail",
    description = "Returns the account record, its full audit trail (oldest first) and every ledger event recorded against it.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
    ),
    responses(
        (status = 200, description = "Account detail", body = AccountDetail),
        (status = 404, description = "Account not found", body = ErrorResponse),
    )
)]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LifecycleError> {
    let detail = state.reporting.account_detail(AccountId::from(id)).await?;
    Ok(Json(detail))
}

/// `GET /accounts/{id}/access` — What the user may do right now.
///
/// # Errors
///
/// Returns [`LifecycleError::AccountNotFound`] if the account does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}/access",
    tag = "Accounts",
    summary = "Get access summary",
    description = "Returns the access flags and the countdown to the next user-visible deadline (trial end or scheduled deletion).",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
    ),
    responses(
        (status = 200, description = "Access summary", body = AccessSummary),
        (status = 404, description = "Account not found", body = ErrorResponse),
    )
)]
pub async fn get_access(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LifecycleError> {
    let summary = state.reporting.access_summary(AccountId::from(id)).await?;
    Ok(Json(summary))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/{id}", get(get_account))
        .route("/accounts/{id}/access", get(get_access))
}
