//! Audit trail types.
//!
//! An [`AuditLogEntry`] is written in the same unit as the account change it
//! describes and is never updated or removed afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AccountId;

/// Value stored in `actor_id` for scheduler-driven actions.
pub const SYSTEM_ACTOR: &str = "system";

/// Opaque administrator identifier issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(String);

impl AdminId {
    /// Wraps an administrator id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who caused a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A privileged human operator.
    Admin(AdminId),
    /// The scheduler or an automated collaborator.
    System,
}

impl Actor {
    /// Returns the value recorded in `actor_id`.
    #[must_use]
    pub fn audit_id(&self) -> &str {
        match self {
            Self::Admin(id) => id.as_str(),
            Self::System => SYSTEM_ACTOR,
        }
    }
}

/// Kind of state change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Account created in `trial_active`.
    StartTrial,
    /// Administrator moved `trial_ends_at` forward.
    ExtendTrial,
    /// Account became `premium_active`.
    ActivatePremium,
    /// `premium_active` -> `premium_cancelled`.
    DeactivatePremium,
    /// Deletion deadline cleared.
    CancelDeletion,
    /// Deletion deadline moved forward.
    ExtendGracePeriod,
    /// Administrator blocked the account.
    Suspend,
    /// Administrator lifted a suspension.
    Reinstate,
    /// Scheduler ended an elapsed trial.
    AutoExpireTrial,
    /// Scheduler moved an account into final notice.
    BeginGracePeriod,
    /// Scheduler deleted an account whose grace window elapsed.
    AutoDelete,
}

impl ActionType {
    /// Every action type.
    pub const ALL: [Self; 11] = [
        Self::StartTrial,
        Self::ExtendTrial,
        Self::ActivatePremium,
        Self::DeactivatePremium,
        Self::CancelDeletion,
        Self::ExtendGracePeriod,
        Self::Suspend,
        Self::Reinstate,
        Self::AutoExpireTrial,
        Self::BeginGracePeriod,
        Self::AutoDelete,
    ];

    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartTrial => "start_trial",
            Self::ExtendTrial => "extend_trial",
            Self::ActivatePremium => "activate_premium",
            Self::DeactivatePremium => "deactivate_premium",
            Self::CancelDeletion => "cancel_deletion",
            Self::ExtendGracePeriod => "extend_grace_period",
            Self::Suspend => "suspend",
            Self::Reinstate => "reinstate",
            Self::AutoExpireTrial => "auto_expire_trial",
            Self::BeginGracePeriod => "begin_grace_period",
            Self::AutoDelete => "auto_delete",
        }
    }

    /// Parses the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == s)
    }

    /// Returns `true` for actions only the scheduler performs.
    #[must_use]
    pub const fn is_automatic(&self) -> bool {
        matches!(
            self,
            Self::AutoExpireTrial | Self::BeginGracePeriod | Self::AutoDelete
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    /// Entry id.
    pub id: uuid::Uuid,
    /// Account the action applied to.
    #[schema(value_type = uuid::Uuid)]
    pub target_account_id: AccountId,
    /// Administrator id, or [`SYSTEM_ACTOR`].
    pub actor_id: String,
    /// What happened.
    pub action_type: ActionType,
    /// Justification; empty for system actions.
    pub reason: String,
    /// Structured payload, e.g. `{"days": 7}`.
    pub details: serde_json::Value,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Builds a new entry with a fresh id.
    #[must_use]
    pub fn new(
        target_account_id: AccountId,
        actor: &Actor,
        action_type: ActionType,
        reason: &str,
        details: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            target_account_id,
            actor_id: actor.audit_id().to_string(),
            action_type,
            reason: reason.to_string(),
            details,
            created_at,
        }
    }
}
