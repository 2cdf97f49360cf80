//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::dto::{
    AccountListResponse, CreateAccountRequest, CursorMeta, ExtensionRequest, ReasonRequest,
    RecordEventRequest,
};
use crate::api::handlers::{accounts, admin, dashboard, events, system};
use crate::domain::{
    Account, AccountStatus, ActionType, AuditLogEntry, Deadline, DeadlineKind, EventSource,
    EventSourceFilter, LifecycleEvent,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::{AccessSummary, AccountDetail, DashboardStats, PendingDeletion};

/// Generated API description served by Swagger UI.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "account-lifecycle",
        description = "Trials, premium subscriptions, grace periods and audited administrator overrides."
    ),
    paths(
        system::health_handler,
        accounts::create_account,
        accounts::list_accounts,
        accounts::get_account,
        accounts::get_access,
        admin::extend_trial,
        admin::activate_premium,
        admin::deactivate_premium,
        admin::cancel_deletion,
        admin::extend_grace_period,
        admin::suspend,
        admin::reinstate,
        events::record_event,
        events::recent_events,
        dashboard::stats,
        dashboard::expiring_trials,
        dashboard::pending_deletions,
        dashboard::recent_audit,
    ),
    components(schemas(
        Account,
        AccountStatus,
        Deadline,
        DeadlineKind,
        ActionType,
        AuditLogEntry,
        LifecycleEvent,
        EventSource,
        EventSourceFilter,
        AccessSummary,
        AccountDetail,
        DashboardStats,
        PendingDeletion,
        AccountListResponse,
        CursorMeta,
        CreateAccountRequest,
        ReasonRequest,
        ExtensionRequest,
        RecordEventRequest,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Accounts", description = "Signup and read access"),
        (name = "Admin", description = "Privileged overrides; require `x-admin-id`"),
        (name = "Events", description = "Payment-processor and manual event ledger"),
        (name = "Dashboard", description = "Aggregates and audit feed"),
        (name = "System", description = "Liveness"),
    )
)]
pub struct ApiDoc;
