//! In-process store implementing all three persistence traits.
//!
//! Accounts and audit entries share one [`tokio::sync::RwLock`], so the
//! compare-and-set check, the account write and the audit append happen
//! under a single write guard. Readers either see all of a transition or
//! none of it. The ledger has its own lock since it is never written
//! together with an account.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{AccountStore, AuditLogReader, EventLedger, Expected, Page, PageRequest};
use crate::domain::{
    Account, AccountId, AccountStatus, AuditLogEntry, EventSourceFilter, LifecycleEvent,
};
use crate::error::LifecycleError;

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    audit: Vec<AuditLogEntry>,
}

/// Volatile store used by tests and single-node deployments.
///
/// # Concurrency
///
/// - Reads run concurrently.
/// - Writes to accounts are serialised; the CAS check makes the loser of a
///   race observe [`LifecycleError::Conflict`] instead of overwriting.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    ledger: RwLock<Vec<LifecycleEvent>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of audit entries across all accounts.
    pub async fn audit_len(&self) -> usize {
        self.inner.read().await.audit.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get(&self, id: AccountId) -> Result<Account, LifecycleError> {
        let inner = self.inner.read().await;
        inner
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LifecycleError::AccountNotFound(id))
    }

    async fn insert(
        &self,
        account: &Account,
        audit: &AuditLogEntry,
    ) -> Result<(), LifecycleError> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&account.id) {
            return Err(LifecycleError::Validation(format!(
                "account {} already exists",
                account.id
            )));
        }
        inner.accounts.insert(account.id, account.clone());
        inner.audit.push(audit.clone());
        Ok(())
    }

    async fn update(
        &self,
        next: &Account,
        expected: Expected,
        audit: &AuditLogEntry,
    ) -> Result<Account, LifecycleError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .accounts
            .get_mut(&next.id)
            .ok_or(LifecycleError::AccountNotFound(next.id))?;

        if stored.status != expected.status || stored.version != expected.version {
            return Err(LifecycleError::Conflict {
                account_id: next.id,
                expected: expected.status,
            });
        }

        let mut committed = next.clone();
        committed.version = expected.version.saturating_add(1);
        *stored = committed.clone();
        inner.audit.push(audit.clone());
        Ok(committed)
    }

    async fn list_by_status(
        &self,
        status: AccountStatus,
        before: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Page<Account>, LifecycleError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&Account> = inner
            .accounts
            .values()
            .filter(|account| account.status == status)
            .filter(|account| match before {
                Some(cutoff) => account
                    .next_deadline
                    .is_some_and(|deadline| deadline.at <= cutoff),
                None => true,
            })
            .filter(|account| page.after.is_none_or(|after| account.id > after))
            .collect();
        matching.sort_by_key(|account| account.id);

        let items: Vec<Account> = matching.into_iter().take(page.limit).cloned().collect();
        let next_cursor = if items.len() == page.limit {
            items.last().map(|account| account.id)
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }

    async fn count_by_status(&self) -> Result<BTreeMap<AccountStatus, u64>, LifecycleError> {
        let inner = self.inner.read().await;
        let mut counts = BTreeMap::new();
        for account in inner.accounts.values() {
            *counts.entry(account.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, LifecycleError> {
        let inner = self.inner.read().await;
        let count = inner
            .accounts
            .values()
            .filter(|account| account.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn count_scheduled_deletions(&self) -> Result<u64, LifecycleError> {
        let inner = self.inner.read().await;
        let count = inner
            .accounts
            .values()
            .filter(|account| account.is_grace_eligible())
            .count();
        Ok(count as u64)
    }

    async fn count_trials_ending_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, LifecycleError> {
        let inner = self.inner.read().await;
        let count = inner
            .accounts
            .values()
            .filter(|account| account.status == AccountStatus::TrialActive)
            .filter(|account| account.trial_ends_at > after && account.trial_ends_at <= until)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl AuditLogReader for InMemoryStore {
    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<AuditLogEntry>, LifecycleError> {
        let inner = self.inner.read().await;
        Ok(inner
            .audit
            .iter()
            .filter(|entry| entry.target_account_id == account_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, LifecycleError> {
        let inner = self.inner.read().await;
        Ok(inner.audit.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl EventLedger for InMemoryStore {
    async fn append(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        self.ledger.write().await.push(event.clone());
        Ok(())
    }

    async fn events_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .iter()
            .rev()
            .filter(|event| event.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn recent(
        &self,
        filter: EventSourceFilter,
        limit: usize,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .iter()
            .rev()
            .filter(|event| filter.matches(event))
            .take(limit)
            .cloned()
            .collect())
    }
}
