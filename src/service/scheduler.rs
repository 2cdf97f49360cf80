//! Time-driven scheduler for automatic transitions.
//!
//! A tick scans each status for accounts whose normalised deadline has
//! passed and asks the [`TransitionEngine`] to advance them. Eligibility is
//! computed from absolute deadlines, so a tick after downtime catches up on
//! everything that fell due in between.
//!
//! Statuses are scanned in [`TICK_ORDER`]: an account moved by one scan is
//! never seen again by a later scan of the same tick, so each tick advances
//! an account by at most one edge.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::domain::{Account, AccountStatus};
use crate::error::LifecycleError;
use crate::persistence::StatusScan;
use crate::service::TransitionEngine;

/// Order in which statuses are scanned during one tick.
pub const TICK_ORDER: [AccountStatus; 4] = [
    AccountStatus::GracePeriod,
    AccountStatus::TrialExpired,
    AccountStatus::PremiumCancelled,
    AccountStatus::TrialActive,
];

/// Scheduler knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Accounts fetched per scan page.
    pub page_size: usize,
    /// Upper bound on one account's transition attempt.
    pub account_timeout: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            page_size: 100,
            account_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome counters of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Due candidates returned by the scans.
    pub scanned: usize,
    /// Transitions committed.
    pub applied: usize,
    /// Candidates that lost a compare-and-set race.
    pub conflicts: usize,
    /// Candidates no longer eligible when processed.
    pub skipped: usize,
    /// Candidates that errored or timed out.
    pub failed: usize,
    /// Status scans aborted by a store error.
    pub scan_failures: usize,
}

impl TickReport {
    /// Returns `true` if the tick found nothing to do.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.scanned == 0 && self.scan_failures == 0
    }
}

/// Periodic driver of automatic transitions.
#[derive(Debug, Clone)]
pub struct Scheduler {
    engine: Arc<TransitionEngine>,
    settings: SchedulerSettings,
}

impl Scheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(engine: Arc<TransitionEngine>, settings: SchedulerSettings) -> Self {
        Self { engine, settings }
    }

    /// Runs one pass over every status with a time-based deadline.
    ///
    /// Never fails as a whole: per-account and per-scan errors are logged
    /// and counted in the returned [`TickReport`].
    pub async fn tick(&self) -> TickReport {
        let now = self.engine.clock().now();
        let mut report = TickReport::default();

        for status in TICK_ORDER {
            let mut scan = StatusScan::new(
                Arc::clone(self.engine.accounts()),
                status,
                Some(now),
                self.settings.page_size,
            );
            loop {
                match scan.next_page().await {
                    Ok(Some(page)) => {
                        for account in &page {
                            report.scanned += 1;
                            self.process(account, &mut report).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(%status, error = %e, "status scan failed");
                        report.scan_failures += 1;
                        break;
                    }
                }
            }
        }

        report
    }

    async fn process(&self, account: &Account, report: &mut TickReport) {
        let attempt = tokio::time::timeout(
            self.settings.account_timeout,
            self.engine.advance_due(account),
        )
        .await;

        match attempt {
            Ok(Ok(Some(_))) => report.applied += 1,
            Ok(Ok(None)) => report.skipped += 1,
            Ok(Err(LifecycleError::Conflict { .. })) => {
                tracing::warn!(account_id = %account.id, status = %account.status, "account changed concurrently, skipping");
                report.conflicts += 1;
            }
            Ok(Err(
                e @ (LifecycleError::InvalidTransition { .. } | LifecycleError::AccountNotFound(_)),
            )) => {
                tracing::debug!(account_id = %account.id, error = %e, "candidate no longer eligible");
                report.skipped += 1;
            }
            Ok(Err(e)) => {
                tracing::warn!(account_id = %account.id, error = %e, "automatic transition failed");
                report.failed += 1;
            }
            Err(_) => {
                tracing::warn!(
                    account_id = %account.id,
                    timeout = ?self.settings.account_timeout,
                    "automatic transition timed out"
                );
                report.failed += 1;
            }
        }
    }

    /// Ticks every `interval` until `shutdown` flips to `true` or its
    /// sender is dropped. The first tick runs immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = tokio::time::interval(self.settings.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            page_size = self.settings.page_size,
            "scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = timer.tick() => {
                    let report = self.tick().await;
                    if report.is_idle() {
                        tracing::debug!("scheduler tick: nothing due");
                    } else {
                        tracing::info!(
                            scanned = report.scanned,
                            applied = report.applied,
                            conflicts = report.conflicts,
                            skipped = report.skipped,
                            failed = report.failed,
                            scan_failures = report.scan_failures,
                            "scheduler tick"
                        );
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::domain::{
        AccountId, ActionType, Actor, AdminId, AuditLogEntry, Clock, EventBus, LifecyclePolicy,
        ManualClock, Reason,
    };
    use crate::persistence::{
        AccountStore, AuditLogReader, Expected, InMemoryStore, Page, PageRequest,
    };

    struct Fixture {
        engine: Arc<TransitionEngine>,
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture_with(accounts: Arc<dyn AccountStore>, store: Arc<InMemoryStore>) -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = Arc::new(TransitionEngine::new(
            accounts,
            Arc::clone(&clock) as Arc<dyn Clock>,
            LifecyclePolicy::default(),
            EventBus::new(64),
        ));
        Fixture {
            engine,
            store,
            clock,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        fixture_with(Arc::clone(&store) as Arc<dyn AccountStore>, store)
    }

    fn scheduler(f: &Fixture, page_size: usize) -> Scheduler {
        Scheduler::new(
            Arc::clone(&f.engine),
            SchedulerSettings {
                interval: Duration::from_millis(10),
                page_size,
                account_timeout: Duration::from_millis(200),
            },
        )
    }

    #[tokio::test]
    async fn elapsed_trial_expires_on_tick() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(chrono::Duration::days(14) + chrono::Duration::seconds(1));

        let report = scheduler(&f, 10).tick().await;
        assert_eq!(report.applied, 1);

        let stored = f.store.get(account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::TrialExpired);
        let entries = f.store.entries_for_account(account.id).await.unwrap();
        let automatic: Vec<_> = entries
            .iter()
            .filter(|e| e.action_type == ActionType::AutoExpireTrial)
            .collect();
        assert_eq!(automatic.len(), 1);
    }

    #[tokio::test]
    async fn second_tick_is_a_no_op() {
        let f = fixture();
        for _ in 0..5 {
            f.engine.start_trial(AccountId::new()).await.unwrap();
        }
        f.clock.advance(chrono::Duration::days(15));
        let scheduler = scheduler(&f, 2);

        let first = scheduler.tick().await;
        assert_eq!(first.applied, 5);
        let audit_after_first = f.store.audit_len().await;

        let second = scheduler.tick().await;
        assert_eq!(second, TickReport::default());
        assert_eq!(f.store.audit_len().await, audit_after_first);
    }

    #[tokio::test]
    async fn one_edge_per_tick_even_after_downtime() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(chrono::Duration::days(100));
        let scheduler = scheduler(&f, 10);

        let expected = [
            AccountStatus::TrialExpired,
            AccountStatus::GracePeriod,
            AccountStatus::Deleted,
        ];
        for status in expected {
            let report = scheduler.tick().await;
            assert_eq!(report.applied, 1);
            assert_eq!(f.store.get(account.id).await.unwrap().status, status);
        }
        assert!(scheduler.tick().await.is_idle());
    }

    #[tokio::test]
    async fn overlapping_ticks_apply_each_edge_once() {
        let f = fixture();
        for _ in 0..8 {
            f.engine.start_trial(AccountId::new()).await.unwrap();
        }
        f.clock.advance(chrono::Duration::days(15));
        let a = scheduler(&f, 3);
        let b = scheduler(&f, 3);

        let (left, right) = tokio::join!(a.tick(), b.tick());
        assert_eq!(left.applied + right.applied, 8);
        assert_eq!(left.failed + right.failed, 0);
        // 8 start_trial + 8 auto_expire_trial
        assert_eq!(f.store.audit_len().await, 16);
    }

    #[tokio::test]
    async fn suspended_accounts_are_left_alone() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine
            .suspend(
                account.id,
                &Actor::Admin(AdminId::new("ops")),
                &Reason::new("investigation").unwrap(),
            )
            .await
            .unwrap();
        f.clock.advance(chrono::Duration::days(60));

        let report = scheduler(&f, 10).tick().await;
        assert!(report.is_idle());
        assert_eq!(
            f.store.get(account.id).await.unwrap().status,
            AccountStatus::Suspended
        );
    }

    /// Store whose `update` hangs for one account.
    #[derive(Debug)]
    struct StallingStore {
        inner: Arc<InMemoryStore>,
        stalled: std::sync::Mutex<Option<AccountId>>,
    }

    #[async_trait]
    impl AccountStore for StallingStore {
        async fn get(&self, id: AccountId) -> Result<Account, LifecycleError> {
            self.inner.get(id).await
        }

        async fn insert(
            &self,
            account: &Account,
            audit: &AuditLogEntry,
        ) -> Result<(), LifecycleError> {
            self.inner.insert(account, audit).await
        }

        async fn update(
            &self,
            next: &Account,
            expected: Expected,
            audit: &AuditLogEntry,
        ) -> Result<Account, LifecycleError> {
            let stalled = *self.stalled.lock().unwrap();
            if stalled == Some(next.id) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.inner.update(next, expected, audit).await
        }

        async fn list_by_status(
            &self,
            status: AccountStatus,
            before: Option<DateTime<Utc>>,
            page: PageRequest,
        ) -> Result<Page<Account>, LifecycleError> {
            self.inner.list_by_status(status, before, page).await
        }

        async fn count_by_status(&self) -> Result<BTreeMap<AccountStatus, u64>, LifecycleError> {
            self.inner.count_by_status().await
        }

        async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, LifecycleError> {
            self.inner.count_created_since(since).await
        }

        async fn count_scheduled_deletions(&self) -> Result<u64, LifecycleError> {
            self.inner.count_scheduled_deletions().await
        }

        async fn count_trials_ending_between(
            &self,
            after: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<u64, LifecycleError> {
            self.inner.count_trials_ending_between(after, until).await
        }
    }

    #[tokio::test]
    async fn stuck_account_does_not_block_the_batch() {
        let store = Arc::new(InMemoryStore::new());
        let stalling = Arc::new(StallingStore {
            inner: Arc::clone(&store),
            stalled: std::sync::Mutex::new(None),
        });
        let f = fixture_with(Arc::clone(&stalling) as Arc<dyn AccountStore>, store);

        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(f.engine.start_trial(AccountId::new()).await.unwrap().id);
        }
        ids.sort();
        *stalling.stalled.lock().unwrap() = ids.first().copied();
        f.clock.advance(chrono::Duration::days(15));

        let report = scheduler(&f, 10).tick().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.applied, 3);
        for id in ids.iter().skip(1) {
            assert_eq!(
                f.store.get(*id).await.unwrap().status,
                AccountStatus::TrialExpired
            );
        }
    }

    #[tokio::test]
    async fn run_ticks_until_shutdown() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(chrono::Duration::days(15));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler(&f, 10).run(rx));

        let mut expired = false;
        for _ in 0..100 {
            if f.store.get(account.id).await.unwrap().status == AccountStatus::TrialExpired {
                expired = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(expired);

        tx.send(true).unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(matches!(stopped, Ok(Ok(()))));
    }
}
