//! Transition engine: the only component allowed to change an account's status.
//!
//! Every operation follows the same steps:
//! read the account, check the edge against its current status, compute the
//! next record (time never moves backwards), then hand the record and its
//! audit entry to [`AccountStore::update`] as one compare-and-set write.
//! Errors are returned as-is; the engine never retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{
    Account, AccountId, AccountStatus, ActionType, Actor, AuditLogEntry, Clock, DeadlineKind,
    EventBus, ExtensionDays, LifecyclePolicy, Reason,
};
use crate::error::LifecycleError;
use crate::persistence::{AccountStore, Expected};

/// Next record plus the action-specific audit details.
struct Change {
    next: Account,
    details: Map<String, Value>,
}

impl Change {
    fn of(current: &Account) -> Self {
        Self {
            next: current.clone(),
            details: Map::new(),
        }
    }

    fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

fn illegal(account: &Account, action: ActionType) -> LifecycleError {
    LifecycleError::InvalidTransition {
        account_id: account.id,
        status: account.status,
        action,
    }
}

fn push_forward(
    deadline: DateTime<Utc>,
    days: ExtensionDays,
) -> Result<DateTime<Utc>, LifecycleError> {
    deadline
        .checked_add_signed(days.as_duration())
        .ok_or_else(|| LifecycleError::Validation("extended deadline is out of range".to_string()))
}

/// Validates and applies lifecycle transitions.
#[derive(Debug, Clone)]
pub struct TransitionEngine {
    accounts: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
    event_bus: EventBus,
}

impl TransitionEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        clock: Arc<dyn Clock>,
        policy: LifecyclePolicy,
        event_bus: EventBus,
    ) -> Self {
        Self {
            accounts,
            clock,
            policy,
            event_bus,
        }
    }

    /// Returns the account store the engine writes to.
    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    /// Returns the engine's time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the timing policy.
    #[must_use]
    pub const fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Returns the bus committed audit entries are published on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Creates a `trial_active` account at signup.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] if the id is already taken, or a
    /// persistence error.
    pub async fn start_trial(&self, account_id: AccountId) -> Result<Account, LifecycleError> {
        let now = self.clock.now();
        let account = Account::new_trial(
            account_id,
            now,
            self.policy.trial_length,
            self.policy.deletion_notice,
        );
        let mut details = Map::new();
        details.insert("to".to_string(), account.status.as_str().into());
        details.insert(
            "trial_ends_at".to_string(),
            account.trial_ends_at.to_rfc3339().into(),
        );
        let audit = AuditLogEntry::new(
            account_id,
            &Actor::System,
            ActionType::StartTrial,
            "",
            Value::Object(details),
            now,
        );

        self.accounts.insert(&account, &audit).await?;
        tracing::info!(
            %account_id,
            trial_ends_at = %account.trial_ends_at,
            "trial started"
        );
        let _ = self.event_bus.publish(audit);
        Ok(account)
    }

    /// `trial_active -> trial_expired` once the trial window has elapsed.
    ///
    /// Starts the grace window at `trial_ends_at`, not at the time of the call.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if the account is not an
    /// elapsed trial; otherwise see [`AccountStore::update`].
    pub async fn expire_trial(&self, account_id: AccountId) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.expire_trial_from(&current).await
    }

    async fn expire_trial_from(&self, current: &Account) -> Result<Account, LifecycleError> {
        let grace_period = self.policy.grace_period;
        self.commit(
            current,
            &Actor::System,
            ActionType::AutoExpireTrial,
            "",
            |account, now| {
                if account.status != AccountStatus::TrialActive || account.trial_ends_at > now {
                    return Err(illegal(account, ActionType::AutoExpireTrial));
                }
                let deletion_at = account.trial_ends_at + grace_period;
                let mut change = Change::of(account)
                    .detail("trial_ended_at", account.trial_ends_at.to_rfc3339())
                    .detail("deletion_scheduled_at", deletion_at.to_rfc3339());
                change.next.status = AccountStatus::TrialExpired;
                change.next.grace_period_ends_at = Some(deletion_at);
                change.next.grace_origin = None;
                Ok(change)
            },
        )
        .await
    }

    /// `trial_expired | premium_cancelled -> grace_period` once deletion is
    /// within the notice window.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if no deletion is scheduled or
    /// the notice window has not opened yet.
    pub async fn begin_grace_period(
        &self,
        account_id: AccountId,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.begin_grace_period_from(&current).await
    }

    async fn begin_grace_period_from(&self, current: &Account) -> Result<Account, LifecycleError> {
        let notice = self.policy.deletion_notice;
        self.commit(
            current,
            &Actor::System,
            ActionType::BeginGracePeriod,
            "",
            |account, now| {
                let deletion_at = match account.grace_period_ends_at {
                    Some(at) if account.status.is_pre_grace() && at - notice <= now => at,
                    _ => return Err(illegal(account, ActionType::BeginGracePeriod)),
                };
                let mut change = Change::of(account)
                    .detail("deletion_scheduled_at", deletion_at.to_rfc3339());
                change.next.grace_origin = Some(account.status);
                change.next.status = AccountStatus::GracePeriod;
                Ok(change)
            },
        )
        .await
    }

    /// `grace_period -> deleted` once the deletion deadline has passed.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless the account is in
    /// `grace_period` with an elapsed deadline.
    pub async fn auto_delete(&self, account_id: AccountId) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.auto_delete_from(&current).await
    }

    async fn auto_delete_from(&self, current: &Account) -> Result<Account, LifecycleError> {
        self.commit(
            current,
            &Actor::System,
            ActionType::AutoDelete,
            "",
            |account, now| {
                let deletion_at = match account.grace_period_ends_at {
                    Some(at) if account.status == AccountStatus::GracePeriod && at <= now => at,
                    _ => return Err(illegal(account, ActionType::AutoDelete)),
                };
                let mut change = Change::of(account)
                    .detail("deletion_scheduled_at", deletion_at.to_rfc3339());
                change.next.status = AccountStatus::Deleted;
                change.next.premium_since = None;
                change.next.grace_period_ends_at = None;
                change.next.grace_origin = None;
                change.next.suspended_from = None;
                Ok(change)
            },
        )
        .await
    }

    /// Moves `trial_ends_at` forward by `days` from its current value.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless the account is
    /// `trial_active`.
    pub async fn extend_trial(
        &self,
        account_id: AccountId,
        days: ExtensionDays,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::ExtendTrial,
            reason.as_str(),
            |account, _| {
                if account.status != AccountStatus::TrialActive {
                    return Err(illegal(account, ActionType::ExtendTrial));
                }
                let previous = account.trial_ends_at;
                let extended = push_forward(previous, days)?;
                let mut change = Change::of(account)
                    .detail("days", days.get())
                    .detail("previous_deadline", previous.to_rfc3339())
                    .detail("new_deadline", extended.to_rfc3339());
                change.next.trial_ends_at = extended;
                Ok(change)
            },
        )
        .await
    }

    /// Makes the account `premium_active` and cancels any scheduled deletion.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] from `premium_active`,
    /// `suspended` or `deleted`.
    pub async fn activate_premium(
        &self,
        account_id: AccountId,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::ActivatePremium,
            reason.as_str(),
            |account, now| {
                if !matches!(
                    account.status,
                    AccountStatus::TrialActive
                        | AccountStatus::TrialExpired
                        | AccountStatus::PremiumCancelled
                        | AccountStatus::GracePeriod
                ) {
                    return Err(illegal(account, ActionType::ActivatePremium));
                }
                let mut change = Change::of(account);
                if let Some(at) = account.grace_period_ends_at {
                    change = change.detail("cancelled_deletion_at", at.to_rfc3339());
                }
                change.next.status = AccountStatus::PremiumActive;
                change.next.premium_since = Some(now);
                change.next.grace_period_ends_at = None;
                change.next.grace_origin = None;
                Ok(change)
            },
        )
        .await
    }

    /// `premium_active -> premium_cancelled`, scheduling deletion after the
    /// grace window.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless the account is
    /// `premium_active`.
    pub async fn deactivate_premium(
        &self,
        account_id: AccountId,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        let grace_period = self.policy.grace_period;
        self.commit(
            &current,
            actor,
            ActionType::DeactivatePremium,
            reason.as_str(),
            |account, now| {
                if account.status != AccountStatus::PremiumActive {
                    return Err(illegal(account, ActionType::DeactivatePremium));
                }
                let deletion_at = now + grace_period;
                let mut change = Change::of(account)
                    .detail("deletion_scheduled_at", deletion_at.to_rfc3339());
                change.next.status = AccountStatus::PremiumCancelled;
                change.next.grace_period_ends_at = Some(deletion_at);
                Ok(change)
            },
        )
        .await
    }

    /// Clears the deletion deadline.
    ///
    /// From `grace_period` the account returns to the status it entered
    /// grace from; pre-grace accounts keep their status. Nothing else on the
    /// record changes.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if no deletion is scheduled.
    pub async fn cancel_deletion(
        &self,
        account_id: AccountId,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::CancelDeletion,
            reason.as_str(),
            |account, _| {
                let Some(deletion_at) = account
                    .grace_period_ends_at
                    .filter(|_| account.is_grace_eligible())
                else {
                    return Err(illegal(account, ActionType::CancelDeletion));
                };
                let mut change = Change::of(account)
                    .detail("cancelled_deletion_at", deletion_at.to_rfc3339());
                if account.status == AccountStatus::GracePeriod {
                    change.next.status = account.grace_origin.ok_or_else(|| {
                        LifecycleError::Internal(format!(
                            "account {} is in grace_period without an origin status",
                            account.id
                        ))
                    })?;
                }
                change.next.grace_period_ends_at = None;
                change.next.grace_origin = None;
                Ok(change)
            },
        )
        .await
    }

    /// Moves the deletion deadline forward by `days` from its current value.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] if no deletion is scheduled.
    pub async fn extend_grace_period(
        &self,
        account_id: AccountId,
        days: ExtensionDays,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::ExtendGracePeriod,
            reason.as_str(),
            |account, _| {
                let Some(previous) = account
                    .grace_period_ends_at
                    .filter(|_| account.is_grace_eligible())
                else {
                    return Err(illegal(account, ActionType::ExtendGracePeriod));
                };
                let extended = push_forward(previous, days)?;
                let mut change = Change::of(account)
                    .detail("days", days.get())
                    .detail("previous_deadline", previous.to_rfc3339())
                    .detail("new_deadline", extended.to_rfc3339());
                change.next.grace_period_ends_at = Some(extended);
                Ok(change)
            },
        )
        .await
    }

    /// Blocks the account, remembering its status for [`Self::reinstate`].
    ///
    /// Trial and grace timestamps are kept but no deadline runs while
    /// suspended.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] from `suspended` or `deleted`.
    pub async fn suspend(
        &self,
        account_id: AccountId,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::Suspend,
            reason.as_str(),
            |account, _| {
                if account.status == AccountStatus::Suspended || account.status.is_terminal() {
                    return Err(illegal(account, ActionType::Suspend));
                }
                let mut change = Change::of(account);
                change.next.suspended_from = Some(account.status);
                change.next.status = AccountStatus::Suspended;
                Ok(change)
            },
        )
        .await
    }

    /// Lifts a suspension and restores the prior status.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidTransition`] unless the account is
    /// `suspended`; [`LifecycleError::Internal`] if the prior status was
    /// never recorded.
    pub async fn reinstate(
        &self,
        account_id: AccountId,
        actor: &Actor,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let current = self.accounts.get(account_id).await?;
        self.commit(
            &current,
            actor,
            ActionType::Reinstate,
            reason.as_str(),
            |account, _| {
                if account.status != AccountStatus::Suspended {
                    return Err(illegal(account, ActionType::Reinstate));
                }
                let restored = account.suspended_from.ok_or_else(|| {
                    LifecycleError::Internal(format!(
                        "suspended account {} has no prior status",
                        account.id
                    ))
                })?;
                let mut change = Change::of(account);
                change.next.status = restored;
                change.next.suspended_from = None;
                Ok(change)
            },
        )
        .await
    }

    /// Applies the automatic transition for `snapshot`'s deadline, if due.
    ///
    /// The snapshot's `(status, version)` is used as the compare-and-set
    /// expectation without re-reading, so a snapshot that went stale after
    /// it was listed yields [`LifecycleError::Conflict`]. Returns `None` when
    /// nothing is due.
    ///
    /// # Errors
    ///
    /// Same as the underlying edge.
    pub async fn advance_due(&self, snapshot: &Account) -> Result<Option<Account>, LifecycleError> {
        let Some(deadline) = snapshot.due_deadline(self.clock.now()) else {
            return Ok(None);
        };
        let committed = match deadline.kind {
            DeadlineKind::TrialEnd => self.expire_trial_from(snapshot).await?,
            DeadlineKind::GraceNotice => self.begin_grace_period_from(snapshot).await?,
            DeadlineKind::Deletion => self.auto_delete_from(snapshot).await?,
        };
        Ok(Some(committed))
    }

    /// Runs `edge` against `current` and writes the result with its audit
    /// entry. The entry is published only after the write committed.
    async fn commit<F>(
        &self,
        current: &Account,
        actor: &Actor,
        action: ActionType,
        reason: &str,
        edge: F,
    ) -> Result<Account, LifecycleError>
    where
        F: FnOnce(&Account, DateTime<Utc>) -> Result<Change, LifecycleError> + Send,
    {
        if action.is_automatic() && *actor != Actor::System {
            return Err(LifecycleError::Internal(format!(
                "{action} may only be committed by the scheduler"
            )));
        }
        let now = self.clock.now();
        let Change {
            mut next,
            mut details,
        } = edge(current, now)?;
        next.updated_at = now;
        next.refresh_deadline(self.policy.deletion_notice);

        details.insert("from".to_string(), current.status.as_str().into());
        details.insert("to".to_string(), next.status.as_str().into());
        let audit = AuditLogEntry::new(
            current.id,
            actor,
            action,
            reason,
            Value::Object(details),
            now,
        );

        let committed = self
            .accounts
            .update(&next, Expected::of(current), &audit)
            .await?;

        tracing::info!(
            account_id = %committed.id,
            %action,
            from = %current.status,
            to = %committed.status,
            actor = actor.audit_id(),
            "transition committed"
        );
        let _ = self.event_bus.publish(audit);
        Ok(committed)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::{AdminId, ManualClock};
    use crate::persistence::{AuditLogReader, InMemoryStore};
    use chrono::Duration;

    struct Fixture {
        engine: TransitionEngine,
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = TransitionEngine::new(
            Arc::clone(&store) as Arc<dyn AccountStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            LifecyclePolicy::default(),
            EventBus::new(64),
        );
        Fixture {
            engine,
            store,
            clock,
        }
    }

    fn admin() -> Actor {
        Actor::Admin(AdminId::new("admin-1"))
    }

    fn reason(text: &str) -> Reason {
        Reason::new(text).unwrap()
    }

    fn days(n: i64) -> ExtensionDays {
        ExtensionDays::new(n).unwrap()
    }

    async fn premium(f: &Fixture) -> Account {
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine
            .activate_premium(account.id, &admin(), &reason("paid"))
            .await
            .unwrap()
    }

    async fn deleted(f: &Fixture) -> Account {
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(14));
        f.engine.expire_trial(account.id).await.unwrap();
        f.clock.advance(Duration::days(30));
        f.engine.begin_grace_period(account.id).await.unwrap();
        f.engine.auto_delete(account.id).await.unwrap()
    }

    async fn actions(f: &Fixture, id: AccountId) -> Vec<ActionType> {
        f.store
            .entries_for_account(id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action_type)
            .collect()
    }

    #[tokio::test]
    async fn start_trial_writes_account_and_audit() {
        let f = fixture();
        let now = f.clock.now();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();

        assert_eq!(account.status, AccountStatus::TrialActive);
        assert_eq!(account.trial_ends_at, now + Duration::days(14));
        assert_eq!(actions(&f, account.id).await, vec![ActionType::StartTrial]);
    }

    #[tokio::test]
    async fn start_trial_rejects_duplicate_id() {
        let f = fixture();
        let id = AccountId::new();
        f.engine.start_trial(id).await.unwrap();
        assert!(matches!(
            f.engine.start_trial(id).await,
            Err(LifecycleError::Validation(_))
        ));
        assert_eq!(f.store.audit_len().await, 1);
    }

    #[tokio::test]
    async fn extend_trial_adds_days_to_current_end() {
        let f = fixture();
        let now = f.clock.now();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();

        let extended = f
            .engine
            .extend_trial(account.id, days(7), &admin(), &reason("support case"))
            .await
            .unwrap();

        assert_eq!(extended.trial_ends_at, now + Duration::days(21));
        let entries = f.store.entries_for_account(account.id).await.unwrap();
        let Some(last) = entries.last() else {
            panic!("no audit entry");
        };
        assert_eq!(last.action_type, ActionType::ExtendTrial);
        assert_eq!(last.details["days"], 7);
        assert_eq!(last.reason, "support case");
        assert_eq!(last.actor_id, "admin-1");
    }

    #[tokio::test]
    async fn extensions_never_move_deadlines_backwards() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        let mut previous = account.trial_ends_at;
        for n in [1, 30, 7, 365] {
            let next = f
                .engine
                .extend_trial(account.id, days(n), &admin(), &reason("goodwill"))
                .await
                .unwrap();
            assert!(next.trial_ends_at > previous);
            previous = next.trial_ends_at;
        }

        let cancelled = premium(&f).await;
        let cancelled = f
            .engine
            .deactivate_premium(cancelled.id, &admin(), &reason("user requested"))
            .await
            .unwrap();
        let mut previous = cancelled.grace_period_ends_at.unwrap();
        for n in [3, 14] {
            let next = f
                .engine
                .extend_grace_period(cancelled.id, days(n), &admin(), &reason("appeal"))
                .await
                .unwrap();
            let deadline = next.grace_period_ends_at.unwrap();
            assert_eq!(deadline, previous + Duration::days(n));
            previous = deadline;
        }
    }

    #[tokio::test]
    async fn extend_trial_rejected_outside_trial() {
        let f = fixture();
        let active = premium(&f).await;

        let suspended = f.engine.start_trial(AccountId::new()).await.unwrap();
        let suspended = f
            .engine
            .suspend(suspended.id, &admin(), &reason("abuse"))
            .await
            .unwrap();

        let deleted = deleted(&f).await;
        assert_eq!(deleted.status, AccountStatus::Deleted);

        for account in [active, suspended, deleted] {
            let before = f.store.get(account.id).await.unwrap();
            let result = f
                .engine
                .extend_trial(account.id, days(7), &admin(), &reason("x"))
                .await;
            assert!(matches!(
                result,
                Err(LifecycleError::InvalidTransition {
                    action: ActionType::ExtendTrial,
                    ..
                })
            ));
            assert_eq!(f.store.get(account.id).await.unwrap(), before);
        }
    }

    #[tokio::test]
    async fn deactivate_then_cancel_deletion_keeps_account_live() {
        let f = fixture();
        let account = premium(&f).await;
        let now = f.clock.now();

        let cancelled = f
            .engine
            .deactivate_premium(account.id, &admin(), &reason("user requested"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, AccountStatus::PremiumCancelled);
        assert_eq!(cancelled.grace_period_ends_at, Some(now + Duration::days(30)));

        f.clock.advance(Duration::days(2));
        let retained = f
            .engine
            .cancel_deletion(account.id, &admin(), &reason("refund issued"))
            .await
            .unwrap();
        assert_eq!(retained.status, AccountStatus::PremiumCancelled);
        assert_eq!(retained.grace_period_ends_at, None);
        assert_eq!(retained.next_deadline, None);
    }

    #[tokio::test]
    async fn cancel_from_grace_period_restores_origin_without_data_loss() {
        let f = fixture();
        let account = premium(&f).await;
        let cancelled = f
            .engine
            .deactivate_premium(account.id, &admin(), &reason("user requested"))
            .await
            .unwrap();

        f.clock.advance(Duration::days(24));
        let Ok(Some(in_grace)) = f.engine.advance_due(&cancelled).await else {
            panic!("grace period not entered");
        };
        assert_eq!(in_grace.status, AccountStatus::GracePeriod);
        assert_eq!(in_grace.grace_origin, Some(AccountStatus::PremiumCancelled));

        let restored = f
            .engine
            .cancel_deletion(account.id, &admin(), &reason("refund issued"))
            .await
            .unwrap();
        assert_eq!(restored.status, AccountStatus::PremiumCancelled);
        assert_eq!(restored.id, cancelled.id);
        assert_eq!(restored.trial_started_at, cancelled.trial_started_at);
        assert_eq!(restored.trial_ends_at, cancelled.trial_ends_at);
        assert_eq!(restored.premium_since, cancelled.premium_since);
        assert_eq!(restored.created_at, cancelled.created_at);
        assert_eq!(restored.grace_origin, None);
    }

    #[tokio::test]
    async fn full_trial_path_to_deletion() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();

        f.clock.advance(Duration::days(14) + Duration::seconds(1));
        let expired = f.engine.expire_trial(account.id).await.unwrap();
        assert_eq!(expired.status, AccountStatus::TrialExpired);
        assert_eq!(
            expired.grace_period_ends_at,
            Some(account.trial_ends_at + Duration::days(30))
        );

        f.clock.advance(Duration::days(23));
        let grace = f.engine.begin_grace_period(account.id).await.unwrap();
        assert_eq!(grace.status, AccountStatus::GracePeriod);

        f.clock.advance(Duration::days(7));
        let deleted = f.engine.auto_delete(account.id).await.unwrap();
        assert_eq!(deleted.status, AccountStatus::Deleted);
        assert_eq!(deleted.next_deadline, None);

        assert_eq!(
            actions(&f, account.id).await,
            vec![
                ActionType::StartTrial,
                ActionType::AutoExpireTrial,
                ActionType::BeginGracePeriod,
                ActionType::AutoDelete,
            ]
        );
    }

    #[tokio::test]
    async fn automatic_edges_refuse_before_deadline() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        assert!(matches!(
            f.engine.expire_trial(account.id).await,
            Err(LifecycleError::InvalidTransition { .. })
        ));
        assert!(matches!(f.engine.advance_due(&account).await, Ok(None)));
        assert_eq!(f.store.audit_len().await, 1);
    }

    #[tokio::test]
    async fn activate_premium_clears_scheduled_deletion() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(15));
        f.engine.expire_trial(account.id).await.unwrap();

        let active = f
            .engine
            .activate_premium(account.id, &admin(), &reason("paid late"))
            .await
            .unwrap();
        assert_eq!(active.status, AccountStatus::PremiumActive);
        assert_eq!(active.premium_since, Some(f.clock.now()));
        assert_eq!(active.grace_period_ends_at, None);
        assert_eq!(active.next_deadline, None);
    }

    #[tokio::test]
    async fn activate_premium_rejected_on_deleted_account() {
        let f = fixture();
        let account = deleted(&f).await;

        let result = f
            .engine
            .activate_premium(account.id, &admin(), &reason("too late"))
            .await;
        let Err(err) = result else {
            panic!("deleted account was reactivated");
        };
        assert!(err.to_string().contains("while it is deleted"));
    }

    #[tokio::test]
    async fn suspend_and_reinstate_round_trip() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();

        let suspended = f
            .engine
            .suspend(account.id, &admin(), &reason("chargeback"))
            .await
            .unwrap();
        assert_eq!(suspended.status, AccountStatus::Suspended);
        assert_eq!(suspended.next_deadline, None);
        assert_eq!(suspended.trial_ends_at, account.trial_ends_at);
        assert!(matches!(
            f.engine
                .suspend(account.id, &admin(), &reason("again"))
                .await,
            Err(LifecycleError::InvalidTransition { .. })
        ));

        let reinstated = f
            .engine
            .reinstate(account.id, &admin(), &reason("resolved"))
            .await
            .unwrap();
        assert_eq!(reinstated.status, AccountStatus::TrialActive);
        assert_eq!(reinstated.suspended_from, None);
        assert_eq!(reinstated.next_deadline, account.next_deadline);
    }

    #[tokio::test]
    async fn suspend_rejected_on_deleted_account() {
        let f = fixture();
        let account = deleted(&f).await;
        let Err(err) = f
            .engine
            .suspend(account.id, &admin(), &reason("abuse"))
            .await
        else {
            panic!("deleted account was suspended");
        };
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition {
                action: ActionType::Suspend,
                ..
            }
        ));
        assert_eq!(f.store.get(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn automatic_actions_refuse_admin_attribution() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(14));

        let result = f
            .engine
            .commit(&account, &admin(), ActionType::AutoExpireTrial, "", |a, _| {
                let mut change = Change::of(a);
                change.next.status = AccountStatus::TrialExpired;
                Ok(change)
            })
            .await;
        assert!(matches!(result, Err(LifecycleError::Internal(_))));
        assert_eq!(
            f.store.get(account.id).await.unwrap().status,
            AccountStatus::TrialActive
        );
        assert_eq!(actions(&f, account.id).await, vec![ActionType::StartTrial]);
    }

    #[tokio::test]
    async fn every_transition_writes_exactly_one_matching_entry() {
        let f = fixture();
        let account = premium(&f).await;
        f.engine
            .deactivate_premium(account.id, &admin(), &reason("r"))
            .await
            .unwrap();
        f.engine
            .extend_grace_period(account.id, days(5), &admin(), &reason("r"))
            .await
            .unwrap();
        f.engine
            .cancel_deletion(account.id, &admin(), &reason("r"))
            .await
            .unwrap();

        let entries = f.store.entries_for_account(account.id).await.unwrap();
        let recorded: Vec<_> = entries.iter().map(|e| e.action_type).collect();
        assert_eq!(
            recorded,
            vec![
                ActionType::StartTrial,
                ActionType::ActivatePremium,
                ActionType::DeactivatePremium,
                ActionType::ExtendGracePeriod,
                ActionType::CancelDeletion,
            ]
        );
        let Some(deactivate) = entries.get(2) else {
            panic!("missing entry");
        };
        assert_eq!(deactivate.details["from"], "premium_active");
        assert_eq!(deactivate.details["to"], "premium_cancelled");
    }

    #[tokio::test]
    async fn committed_entries_are_published() {
        let f = fixture();
        let mut rx = f.engine.event_bus().subscribe();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.engine
            .suspend(account.id, &admin(), &reason("fraud"))
            .await
            .unwrap();

        let Ok(first) = rx.recv().await else {
            panic!("no start_trial broadcast");
        };
        assert_eq!(first.action_type, ActionType::StartTrial);
        let Ok(second) = rx.recv().await else {
            panic!("no suspend broadcast");
        };
        assert_eq!(second.action_type, ActionType::Suspend);
    }

    #[tokio::test]
    async fn failed_transition_publishes_nothing() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        let mut rx = f.engine.event_bus().subscribe();
        let _ = f
            .engine
            .deactivate_premium(account.id, &admin(), &reason("x"))
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_snapshot_conflicts() {
        let f = fixture();
        let account = f.engine.start_trial(AccountId::new()).await.unwrap();
        f.clock.advance(Duration::days(15));
        // Same status, new version.
        f.engine
            .extend_trial(account.id, days(30), &admin(), &reason("late extension"))
            .await
            .unwrap();

        assert!(matches!(
            f.engine.advance_due(&account).await,
            Err(LifecycleError::Conflict { .. })
        ));
        let stored = f.store.get(account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::TrialActive);
    }

    #[tokio::test]
    async fn cancel_deletion_races_auto_delete() {
        let f = fixture();
        let account = premium(&f).await;
        f.engine
            .deactivate_premium(account.id, &admin(), &reason("r"))
            .await
            .unwrap();
        f.clock.advance(Duration::days(24));
        f.engine.begin_grace_period(account.id).await.unwrap();
        f.clock.advance(Duration::days(7));
        let snapshot = f.store.get(account.id).await.unwrap();
        let before = f.store.audit_len().await;

        let engine = Arc::new(f.engine.clone());
        let admin_side = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .cancel_deletion(account.id, &admin(), &reason("a"))
                    .await
            })
        };
        let scheduler_side = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.advance_due(&snapshot).await })
        };
        let cancelled = admin_side.await.unwrap();
        let deleted = scheduler_side.await.unwrap();

        assert!(cancelled.is_ok() != matches!(deleted, Ok(Some(_))));
        assert_eq!(f.store.audit_len().await, before + 1);
        let stored = f.store.get(account.id).await.unwrap();
        if cancelled.is_ok() {
            assert_eq!(stored.status, AccountStatus::PremiumCancelled);
        } else {
            assert_eq!(stored.status, AccountStatus::Deleted);
        }
    }
}
