//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountStatus, ActionType, AuditLogEntry, Deadline, DeadlineKind,
    LifecycleEvent,
};
use crate::error::LifecycleError;

/// Column list shared by every `SELECT`/`RETURNING` on `accounts`.
pub const ACCOUNT_COLUMNS: &str = "id, status, trial_started_at, trial_ends_at, premium_since, \
     grace_period_ends_at, grace_origin, suspended_from, next_deadline_at, deadline_kind, \
     created_at, updated_at, version";

/// A row of the `accounts` table.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    /// Primary key.
    pub id: Uuid,
    /// Status string.
    pub status: String,
    /// Signup instant.
    pub trial_started_at: DateTime<Utc>,
    /// Trial end.
    pub trial_ends_at: DateTime<Utc>,
    /// Premium start.
    pub premium_since: Option<DateTime<Utc>>,
    /// Deletion deadline.
    pub grace_period_ends_at: Option<DateTime<Utc>>,
    /// Status before `grace_period`.
    pub grace_origin: Option<String>,
    /// Status before suspension.
    pub suspended_from: Option<String>,
    /// Normalised deadline instant (indexed).
    pub next_deadline_at: Option<DateTime<Utc>>,
    /// Normalised deadline kind.
    pub deadline_kind: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// CAS version.
    pub version: i64,
}

fn parse_status(value: &str) -> Result<AccountStatus, LifecycleError> {
    value
        .parse()
        .map_err(|_| LifecycleError::Persistence(format!("corrupt status column: {value}")))
}

fn parse_optional_status(value: Option<&str>) -> Result<Option<AccountStatus>, LifecycleError> {
    value.map(parse_status).transpose()
}

impl TryFrom<AccountRow> for Account {
    type Error = LifecycleError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let next_deadline = match (row.next_deadline_at, row.deadline_kind.as_deref()) {
            (Some(at), Some(kind)) => Some(Deadline {
                at,
                kind: DeadlineKind::parse(kind).ok_or_else(|| {
                    LifecycleError::Persistence(format!("corrupt deadline_kind column: {kind}"))
                })?,
            }),
            _ => None,
        };
        Ok(Self {
            id: AccountId::from_uuid(row.id),
            status: parse_status(&row.status)?,
            trial_started_at: row.trial_started_at,
            trial_ends_at: row.trial_ends_at,
            premium_since: row.premium_since,
            grace_period_ends_at: row.grace_period_ends_at,
            grace_origin: parse_optional_status(row.grace_origin.as_deref())?,
            suspended_from: parse_optional_status(row.suspended_from.as_deref())?,
            next_deadline,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: u64::try_from(row.version)
                .map_err(|_| LifecycleError::Persistence("negative version".to_string()))?,
        })
    }
}

/// A row of the `audit_log` table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    /// Entry id.
    pub id: Uuid,
    /// Subject account.
    pub target_account_id: Uuid,
    /// Admin id or `system`.
    pub actor_id: String,
    /// Action string.
    pub action_type: String,
    /// Justification.
    pub reason: String,
    /// JSONB details.
    pub details: serde_json::Value,
    /// Commit instant.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = LifecycleError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let action_type = ActionType::parse(&row.action_type).ok_or_else(|| {
            LifecycleError::Persistence(format!("corrupt action_type column: {}", row.action_type))
        })?;
        Ok(Self {
            id: row.id,
            target_account_id: AccountId::from_uuid(row.target_account_id),
            actor_id: row.actor_id,
            action_type,
            reason: row.reason,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

/// A row of the `lifecycle_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Event id.
    pub id: Uuid,
    /// Subject account.
    pub account_id: Uuid,
    /// Free-form label.
    pub event_type: String,
    /// Processor correlation id.
    pub external_reference: Option<String>,
    /// JSONB metadata.
    pub metadata: serde_json::Value,
    /// Ingestion instant.
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for LifecycleEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            account_id: AccountId::from_uuid(row.account_id),
            event_type: row.event_type,
            external_reference: row.external_reference,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}
