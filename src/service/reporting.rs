//! Read-only queries for the dashboard and user-detail collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Account, AccountId, AccountStatus, AuditLogEntry, Clock, EventSourceFilter, LifecycleEvent,
};
use crate::error::LifecycleError;
use crate::persistence::{
    AccountStore, AuditLogReader, EventLedger, Page, PageRequest, StatusScan,
};

/// Default look-ahead for "trials expiring soon".
pub const DEFAULT_EXPIRING_WINDOW_HOURS: i64 = 24;

const SCAN_PAGE_SIZE: usize = 500;

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    /// All accounts, deleted included.
    pub total_accounts: u64,
    /// Count per status; every status is present.
    pub by_status: BTreeMap<AccountStatus, u64>,
    /// Accounts with a scheduled deletion.
    pub grace_period_accounts: u64,
    /// Running trials ending within the requested window.
    pub trials_expiring_soon: u64,
    /// Accounts created since 00:00 UTC today.
    pub signups_since_midnight: u64,
    /// When the numbers were computed.
    pub generated_at: DateTime<Utc>,
}

/// Whether an account may use the product right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccessSummary {
    /// Account id.
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    /// Current status.
    pub status: AccountStatus,
    /// Full access (running trial or premium).
    pub has_access: bool,
    /// Data visible but not editable.
    pub is_read_only: bool,
    /// Whole days until the trial ends or the account is deleted.
    pub days_remaining: Option<i64>,
    /// End of the trial window.
    pub trial_ends_at: DateTime<Utc>,
    /// Scheduled deletion, if any.
    pub deletion_scheduled_at: Option<DateTime<Utc>>,
}

/// One account with its audit trail and ledger events.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AccountDetail {
    /// The account record.
    pub account: Account,
    /// Audit entries, oldest first.
    pub audit_log: Vec<AuditLogEntry>,
    /// Ledger events, newest first.
    pub events: Vec<LifecycleEvent>,
}

/// An account with a deletion on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PendingDeletion {
    /// Account id.
    #[schema(value_type = uuid::Uuid)]
    pub account_id: AccountId,
    /// Current status.
    pub status: AccountStatus,
    /// Deletion deadline.
    pub deletion_scheduled_at: DateTime<Utc>,
    /// Whole days left, floored at zero.
    pub days_remaining: i64,
}

/// Read side over accounts, audit log and ledger.
#[derive(Debug, Clone)]
pub struct ReportingService {
    accounts: Arc<dyn AccountStore>,
    audit: Arc<dyn AuditLogReader>,
    ledger: Arc<dyn EventLedger>,
    clock: Arc<dyn Clock>,
}

impl ReportingService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        audit: Arc<dyn AuditLogReader>,
        ledger: Arc<dyn EventLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            audit,
            ledger,
            clock,
        }
    }

    async fn scan(
        &self,
        status: AccountStatus,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Account>, LifecycleError> {
        StatusScan::new(Arc::clone(&self.accounts), status, before, SCAN_PAGE_SIZE)
            .collect_all()
            .await
    }

    /// Dashboard counters.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn stats(&self, expiring_within: Duration) -> Result<DashboardStats, LifecycleError> {
        let now = self.clock.now();
        let counts = self.accounts.count_by_status().await?;
        let by_status: BTreeMap<AccountStatus, u64> = AccountStatus::ALL
            .into_iter()
            .map(|status| (status, counts.get(&status).copied().unwrap_or(0)))
            .collect();
        let total_accounts = by_status.values().sum();

        let grace_period_accounts = self.accounts.count_scheduled_deletions().await?;
        let trials_expiring_soon = self
            .accounts
            .count_trials_ending_between(now, now + expiring_within)
            .await?;

        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or(now, |start| start.and_utc());
        let signups_since_midnight = self.accounts.count_created_since(midnight).await?;

        Ok(DashboardStats {
            total_accounts,
            by_status,
            grace_period_accounts,
            trials_expiring_soon,
            signups_since_midnight,
            generated_at: now,
        })
    }

    /// One page of accounts in `status`, ordered by id.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_accounts(
        &self,
        status: AccountStatus,
        page: PageRequest,
    ) -> Result<Page<Account>, LifecycleError> {
        self.accounts.list_by_status(status, None, page).await
    }

    /// Account record plus its audit trail and ledger events.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AccountNotFound`] or a store failure.
    pub async fn account_detail(&self, id: AccountId) -> Result<AccountDetail, LifecycleError> {
        let account = self.accounts.get(id).await?;
        let audit_log = self.audit.entries_for_account(id).await?;
        let events = self.ledger.events_for_account(id).await?;
        Ok(AccountDetail {
            account,
            audit_log,
            events,
        })
    }

    /// Access flags and the countdown shown to the user.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AccountNotFound`] or a store failure.
    pub async fn access_summary(&self, id: AccountId) -> Result<AccessSummary, LifecycleError> {
        let account = self.accounts.get(id).await?;
        let now = self.clock.now();
        let deletion_scheduled_at = account
            .grace_period_ends_at
            .filter(|_| account.is_grace_eligible());
        let days_remaining = match account.status {
            AccountStatus::TrialActive => Some(Account::days_until(account.trial_ends_at, now)),
            _ => deletion_scheduled_at.map(|at| Account::days_until(at, now)),
        };
        Ok(AccessSummary {
            account_id: account.id,
            status: account.status,
            has_access: account.status.has_access(),
            is_read_only: account.status.is_read_only(),
            days_remaining,
            trial_ends_at: account.trial_ends_at,
            deletion_scheduled_at,
        })
    }

    /// Running trials whose end falls in `(now, now + window]`, soonest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn trials_expiring_within(
        &self,
        window: Duration,
    ) -> Result<Vec<Account>, LifecycleError> {
        let now = self.clock.now();
        let mut trials: Vec<Account> = self
            .scan(AccountStatus::TrialActive, Some(now + window))
            .await?
            .into_iter()
            .filter(|account| account.trial_ends_at > now)
            .collect();
        trials.sort_by_key(|account| account.trial_ends_at);
        Ok(trials)
    }

    /// Every account with a scheduled deletion, soonest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>, LifecycleError> {
        let now = self.clock.now();
        let mut pending = Vec::new();
        for status in [
            AccountStatus::GracePeriod,
            AccountStatus::TrialExpired,
            AccountStatus::PremiumCancelled,
        ] {
            for account in self.scan(status, None).await? {
                let Some(at) = account
                    .grace_period_ends_at
                    .filter(|_| account.is_grace_eligible())
                else {
                    continue;
                };
                pending.push(PendingDeletion {
                    account_id: account.id,
                    status: account.status,
                    deletion_scheduled_at: at,
                    days_remaining: Account::days_until(at, now),
                });
            }
        }
        pending.sort_by_key(|entry| entry.deletion_scheduled_at);
        Ok(pending)
    }

    /// Latest ledger events matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn recent_events(
        &self,
        filter: EventSourceFilter,
        limit: usize,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError> {
        self.ledger.recent(filter, limit).await
    }

    /// Latest audit entries across all accounts, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn recent_audit(&self, limit: usize) -> Result<Vec<AuditLogEntry>, LifecycleError> {
        self.audit.recent(limit).await
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::{Actor, AdminId, EventBus, LifecyclePolicy, ManualClock, Reason};
    use crate::persistence::InMemoryStore;
    use crate::service::TransitionEngine;
    use chrono::TimeZone;

    struct Fixture {
        engine: TransitionEngine,
        reporting: ReportingService,
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let engine = TransitionEngine::new(
            Arc::clone(&store) as Arc<dyn AccountStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            LifecyclePolicy::default(),
            EventBus::new(16),
        );
        let reporting = ReportingService::new(
            Arc::clone(&store) as Arc<dyn AccountStore>,
            Arc::clone(&store) as Arc<dyn AuditLogReader>,
            Arc::clone(&store) as Arc<dyn EventLedger>,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Fixture {
            engine,
            reporting,
            store,
            clock,
        }
    }

    fn admin() -> Actor {
        Actor::Admin(AdminId::new("ops"))
    }

    fn reason() -> Reason {
        Reason::new("dashboard test").unwrap()
    }

    #[tokio::test]
    async fn stats_count_every_status() {
        let f = fixture();
        let a = f.engine.start_trial(AccountId::new()).await.unwrap();
        let b = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine
            .activate_premium(a.id, &admin(), &reason())
            .await
            .unwrap();
        f.engine.suspend(b.id, &admin(), &reason()).await.unwrap();

        let stats = f.reporting.stats(Duration::hours(24)).await.unwrap();
        assert_eq!(stats.total_accounts, 3);
        assert_eq!(stats.by_status.len(), AccountStatus::ALL.len());
        assert_eq!(stats.by_status[&AccountStatus::TrialActive], 1);
        assert_eq!(stats.by_status[&AccountStatus::PremiumActive], 1);
        assert_eq!(stats.by_status[&AccountStatus::Suspended], 1);
        assert_eq!(stats.by_status[&AccountStatus::Deleted], 0);
        assert_eq!(stats.signups_since_midnight, 3);
        assert_eq!(stats.trials_expiring_soon, 0);
    }

    #[tokio::test]
    async fn signups_reset_at_midnight_utc() {
        let f = fixture();
        f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::hours(13));
        f.engine.start_trial(AccountId::new()).await.unwrap();

        let stats = f.reporting.stats(Duration::hours(24)).await.unwrap();
        assert_eq!(stats.signups_since_midnight, 1);
    }

    #[tokio::test]
    async fn expiring_trials_respect_the_window() {
        let f = fixture();
        let early = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(2));
        f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(11) + Duration::hours(12));

        let soon = f
            .reporting
            .trials_expiring_within(Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<_> = soon.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![early.id]);

        let stats = f.reporting.stats(Duration::hours(24)).await.unwrap();
        assert_eq!(stats.trials_expiring_soon, 1);
    }

    #[tokio::test]
    async fn pending_deletions_are_ordered_and_skip_retained() {
        let f = fixture();
        let first = f.engine.start_trial(AccountId::new()).await.unwrap();
        let retained = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(1));
        let premium = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine
            .activate_premium(premium.id, &admin(), &reason())
            .await
            .unwrap();
        f.engine
            .deactivate_premium(premium.id, &admin(), &reason())
            .await
            .unwrap();

        f.clock.advance(Duration::days(14));
        f.engine.expire_trial(first.id).await.unwrap();
        f.engine.expire_trial(retained.id).await.unwrap();
        f.engine
            .cancel_deletion(retained.id, &admin(), &reason())
            .await
            .unwrap();

        let pending = f.reporting.pending_deletions().await.unwrap();
        let ids: Vec<_> = pending.iter().map(|p| p.account_id).collect();
        assert_eq!(ids, vec![premium.id, first.id]);
        let Some(head) = pending.first() else {
            panic!("no pending deletion");
        };
        assert_eq!(head.days_remaining, 16);

        let stats = f.reporting.stats(Duration::hours(24)).await.unwrap();
        assert_eq!(stats.grace_period_accounts, 2);
    }

    #[tokio::test]
    async fn access_summary_tracks_status() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(3) + Duration::hours(1));

        let trial = f.reporting.access_summary(account.id).await.unwrap();
        assert!(trial.has_access);
        assert!(!trial.is_read_only);
        assert_eq!(trial.days_remaining, Some(11));
        assert_eq!(trial.deletion_scheduled_at, None);

        f.clock.advance(Duration::days(11));
        f.engine.expire_trial(account.id).await.unwrap();
        let expired = f.reporting.access_summary(account.id).await.unwrap();
        assert!(!expired.has_access);
        assert!(expired.is_read_only);
        assert_eq!(
            expired.deletion_scheduled_at,
            Some(account.trial_ends_at + Duration::days(30))
        );
    }

    #[tokio::test]
    async fn detail_includes_audit_and_events() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        let event = LifecycleEvent::new(
            account.id,
            "payment_succeeded",
            Some("evt_1".to_string()),
            serde_json::json!({"amount": 1200}),
            f.clock.now(),
        );
        f.store.append(&event).await.unwrap();

        let detail = f.reporting.account_detail(account.id).await.unwrap();
        assert_eq!(detail.account, account);
        assert_eq!(detail.audit_log.len(), 1);
        assert_eq!(detail.events, vec![event]);

        assert!(matches!(
            f.reporting.account_detail(AccountId::new()).await,
            Err(LifecycleError::AccountNotFound(_))
        ));
    }
}
