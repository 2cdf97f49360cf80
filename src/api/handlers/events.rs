//! Event ledger handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{RecentEventsParams, RecordEventRequest};
use crate::app_state::AppState;
use crate::domain::{AccountId, LifecycleEvent};
use crate::error::{ErrorResponse, LifecycleError};

/// `POST /accounts/{id}/events` — Append a ledger event.
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] for a blank type or non-object
/// metadata, or [`LifecycleError::AccountNotFound`].
#[utoipa::path(
    post,
    path = "/api/v1/accounts/{id}/events",
    tag = "Events",
    summary = "Record a lifecycle event",
    description = "Appends a payment-processor notification or a manual note to the ledger. Recording never changes account status.",
    params(
        ("id" = uuid::Uuid, Path, description = "Account UUID"),
    ),
    request_body = RecordEventRequest,
    responses(
        (status = 201, description = "Event recorded", body = LifecycleEvent),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
    )
)]
pub async fn record_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RecordEventRequest>,
) -> Result<impl IntoResponse, LifecycleError> {
    let event = state
        .recorder
        .record(
            AccountId::from(id),
            &req.event_type,
            req.external_reference,
            req.metadata.unwrap_or(serde_json::Value::Null),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events` — Latest ledger events.
///
/// # Errors
///
/// Returns [`LifecycleError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List recent events",
    description = "Returns the newest ledger events, optionally restricted to processor-originated (`processor`) or manual (`manual`) entries.",
    params(RecentEventsParams),
    responses(
        (status = 200, description = "Recent events, newest first", body = Vec<LifecycleEvent>),
        (status = 400, description = "Unknown source filter", body = ErrorResponse),
    )
)]
pub async fn recent_events(
    State(state): State<AppState>,
    Query(params): Query<RecentEventsParams>,
) -> Result<impl IntoResponse, LifecycleError> {
    let events = state
        .reporting
        .recent_events(params.source, params.clamped_limit())
        .await?;
    Ok(Json(events))
}

/// Ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/{id}/events", post(record_event))
        .route("/events", get(recent_events))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::api::test_support::{send, test_app};
    use serde_json::json;

    #[tokio::test]
    async fn records_and_filters_by_source() {
        let app = test_app();
        let account = app.state.engine.start_trial(AccountId::new()).await.unwrap();
        let uri = format!("/api/v1/accounts/{}/events", account.id);

        let (status, body) = send(
            &app.router,
            "POST",
            &uri,
            None,
            Some(json!({
                "event_type": "payment_failed",
                "external_reference": "evt_123",
                "metadata": { "amount": 1200 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["metadata"]["amount"], 1200);

        let (status, _) = send(
            &app.router,
            "POST",
            &uri,
            None,
            Some(json!({ "event_type": "support_note" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, all) = send(&app.router, "GET", "/api/v1/events", None, None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, manual) =
            send(&app.router, "GET", "/api/v1/events?source=manual", None, None).await;
        let manual = manual.as_array().unwrap();
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0]["event_type"], "support_note");

        let stored = app.state.engine.accounts().get(account.id).await.unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn array_metadata_is_rejected() {
        let app = test_app();
        let account = app.state.engine.start_trial(AccountId::new()).await.unwrap();

        let (status, _) = send(
            &app.router,
            "POST",
            &format!("/api/v1/accounts/{}/events", account.id),
            None,
            Some(json!({ "event_type": "x", "metadata": [1, 2] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let app = test_app();
        let (status, _) = send(
            &app.router,
            "POST",
            &format!("/api/v1/accounts/{}/events", uuid::Uuid::new_v4()),
            None,
            Some(json!({ "event_type": "payment_succeeded" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
