//! Account status and the capabilities each status grants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LifecycleError;

/// Lifecycle status of an account.
///
/// Only the transition engine changes it. `Deleted` is terminal: the row
/// is kept so its audit history stays queryable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Inside the free trial window.
    TrialActive,
    /// Trial ended without an upgrade. Read-only.
    TrialExpired,
    /// Paying subscriber.
    PremiumActive,
    /// Subscription ended. Read-only.
    PremiumCancelled,
    /// Blocked by an administrator.
    Suspended,
    /// Final notice: deletion is imminent.
    GracePeriod,
    /// Terminal.
    Deleted,
}

impl AccountStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::TrialActive,
        Self::TrialExpired,
        Self::PremiumActive,
        Self::PremiumCancelled,
        Self::Suspended,
        Self::GracePeriod,
        Self::Deleted,
    ];

    /// Returns the wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TrialActive => "trial_active",
            Self::TrialExpired => "trial_expired",
            Self::PremiumActive => "premium_active",
            Self::PremiumCancelled => "premium_cancelled",
            Self::Suspended => "suspended",
            Self::GracePeriod => "grace_period",
            Self::Deleted => "deleted",
        }
    }

    /// Returns `true` for the terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Statuses that can carry a deletion deadline.
    #[must_use]
    pub const fn can_carry_grace(&self) -> bool {
        matches!(
            self,
            Self::TrialExpired | Self::PremiumCancelled | Self::GracePeriod
        )
    }

    /// Statuses that enter the final-notice phase when their deadline nears.
    #[must_use]
    pub const fn is_pre_grace(&self) -> bool {
        matches!(self, Self::TrialExpired | Self::PremiumCancelled)
    }

    /// Returns `true` if the user has full read/write access.
    #[must_use]
    pub const fn has_access(&self) -> bool {
        matches!(self, Self::TrialActive | Self::PremiumActive)
    }

    /// Returns `true` if the user can see but not change their data.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.can_carry_grace()
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::Validation(format!("unknown account status: {s}")))
    }
}
