//! Account record and its normalised deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AccountId, AccountStatus};

/// What happens when an account's deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    /// Trial ends; account becomes `trial_expired`.
    TrialEnd,
    /// Deletion is near; account enters `grace_period`.
    GraceNotice,
    /// Account is deleted.
    Deletion,
}

impl DeadlineKind {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TrialEnd => "trial_end",
            Self::GraceNotice => "grace_notice",
            Self::Deletion => "deletion",
        }
    }

    /// Parses the stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [Self::TrialEnd, Self::GraceNotice, Self::Deletion]
            .into_iter()
            .find(|kind| kind.as_str() == s)
    }
}

/// The next instant at which the scheduler must act on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deadline {
    /// When the deadline falls due.
    pub at: DateTime<Utc>,
    /// Which automatic transition it triggers.
    pub kind: DeadlineKind,
}

impl Deadline {
    /// Returns `true` once `now` has reached the deadline.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.at <= now
    }
}

/// One subscriber account.
///
/// Mutated only by the transition engine; stores apply writes with a
/// compare-and-set on `(status, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    /// Immutable id.
    #[schema(value_type = uuid::Uuid)]
    pub id: AccountId,
    /// Current lifecycle status.
    pub status: AccountStatus,
    /// Signup instant.
    pub trial_started_at: DateTime<Utc>,
    /// End of the trial window; only ever moves forward.
    pub trial_ends_at: DateTime<Utc>,
    /// Set on entering `premium_active`, cleared on deletion.
    pub premium_since: Option<DateTime<Utc>>,
    /// Deletion deadline while a grace window is running.
    pub grace_period_ends_at: Option<DateTime<Utc>>,
    /// Status the account held before entering `grace_period`.
    pub grace_origin: Option<AccountStatus>,
    /// Status the account held before suspension.
    pub suspended_from: Option<AccountStatus>,
    /// Normalised scheduler deadline, derived from the fields above.
    pub next_deadline: Option<Deadline>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last committed change.
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every committed update.
    pub version: u64,
}

impl Account {
    /// Creates a fresh `trial_active` account.
    #[must_use]
    pub fn new_trial(
        id: AccountId,
        now: DateTime<Utc>,
        trial_length: Duration,
        deletion_notice: Duration,
    ) -> Self {
        let mut account = Self {
            id,
            status: AccountStatus::TrialActive,
            trial_started_at: now,
            trial_ends_at: now + trial_length,
            premium_since: None,
            grace_period_ends_at: None,
            grace_origin: None,
            suspended_from: None,
            next_deadline: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        account.refresh_deadline(deletion_notice);
        account
    }

    /// Derives the scheduler deadline from status and stored timestamps.
    #[must_use]
    pub fn compute_deadline(&self, deletion_notice: Duration) -> Option<Deadline> {
        match self.status {
            AccountStatus::TrialActive => Some(Deadline {
                at: self.trial_ends_at,
                kind: DeadlineKind::TrialEnd,
            }),
            AccountStatus::TrialExpired | AccountStatus::PremiumCancelled => {
                self.grace_period_ends_at.map(|ends| Deadline {
                    at: ends - deletion_notice,
                    kind: DeadlineKind::GraceNotice,
                })
            }
            AccountStatus::GracePeriod => self.grace_period_ends_at.map(|ends| Deadline {
                at: ends,
                kind: DeadlineKind::Deletion,
            }),
            AccountStatus::PremiumActive | AccountStatus::Suspended | AccountStatus::Deleted => {
                None
            }
        }
    }

    /// Recomputes [`Account::next_deadline`].
    pub fn refresh_deadline(&mut self, deletion_notice: Duration) {
        self.next_deadline = self.compute_deadline(deletion_notice);
    }

    /// Returns `true` if a deletion is scheduled for this account.
    #[must_use]
    pub fn is_grace_eligible(&self) -> bool {
        self.status.can_carry_grace() && self.grace_period_ends_at.is_some()
    }

    /// Returns the deadline if it has fallen due at `now`.
    #[must_use]
    pub fn due_deadline(&self, now: DateTime<Utc>) -> Option<Deadline> {
        self.next_deadline.filter(|deadline| deadline.is_due(now))
    }

    /// Whole days left until `until`, rounded up and floored at zero.
    #[must_use]
    pub fn days_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let seconds = (until - now).num_seconds();
        if seconds <= 0 {
            return 0;
        }
        (seconds + 86_399) / 86_400
    }
}
