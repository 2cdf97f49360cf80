//! Router fixtures shared by handler tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use crate::app_state::AppState;
use crate::domain::{Clock, EventBus, LifecyclePolicy, ManualClock};
use crate::persistence::{AccountStore, AuditLogReader, EventLedger, InMemoryStore};
use crate::service::{
    AdminCommands, AllowListAuthorizer, EventRecorder, ReportingService, TransitionEngine,
};

pub(crate) const ADMIN: &str = "ops-1";

pub(crate) struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

pub(crate) fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
    ));
    let event_bus = EventBus::new(64);
    let engine = Arc::new(TransitionEngine::new(
        Arc::clone(&store) as Arc<dyn AccountStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        LifecyclePolicy::default(),
        event_bus.clone(),
    ));
    let commands = Arc::new(AdminCommands::new(
        Arc::clone(&engine),
        Arc::new(AllowListAuthorizer::new([ADMIN])),
    ));
    let reporting = Arc::new(ReportingService::new(
        Arc::clone(&store) as Arc<dyn AccountStore>,
        Arc::clone(&store) as Arc<dyn AuditLogReader>,
        Arc::clone(&store) as Arc<dyn EventLedger>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let recorder = Arc::new(EventRecorder::new(
        Arc::clone(&store) as Arc<dyn AccountStore>,
        Arc::clone(&store) as Arc<dyn EventLedger>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let state = AppState {
        engine,
        commands,
        reporting,
        recorder,
        event_bus,
    };
    TestApp {
        router: super::build_router().with_state(state.clone()),
        state,
        clock,
    }
}

pub(crate) async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    admin: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(admin) = admin {
        builder = builder.header(super::ADMIN_ID_HEADER, admin);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let Ok(request) = builder.body(body) else {
        panic!("request builder failed");
    };
    let Ok(response) = router.clone().oneshot(request).await else {
        panic!("router failed");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}
