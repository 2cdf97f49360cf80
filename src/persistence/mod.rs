//! Persistence layer: account store, audit log and event ledger.
//!
//! The three traits are the seams between the services and storage.
//! [`memory::InMemoryStore`] backs tests and single-node runs;
//! [`postgres::PostgresStore`] is the durable implementation.
//!
//! Audit entries are never appended on their own: they travel with the
//! account write in [`AccountStore::insert`] / [`AccountStore::update`], so
//! no reader can see a status change without its audit entry or the other
//! way round.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod scan;

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, AccountStatus, AuditLogEntry, EventSourceFilter, LifecycleEvent,
};
use crate::error::LifecycleError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use scan::StatusScan;

/// The `(status, version)` pair a writer read before deciding on a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    /// Status the caller observed.
    pub status: AccountStatus,
    /// Version the caller observed.
    pub version: u64,
}

impl Expected {
    /// Captures the expectation from a previously read account.
    #[must_use]
    pub fn of(account: &Account) -> Self {
        Self {
            status: account.status,
            version: account.version,
        }
    }
}

/// Keyset pagination request; results are ordered by account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Return only ids strictly greater than this cursor.
    pub after: Option<AccountId>,
    /// Maximum number of rows.
    pub limit: usize,
}

impl PageRequest {
    /// First page of the given size.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self { after: None, limit }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Rows in id order.
    pub items: Vec<T>,
    /// Cursor for the following page; `None` once exhausted.
    pub next_cursor: Option<AccountId>,
}

/// Durable account records.
#[async_trait]
pub trait AccountStore: Send + Sync + Debug {
    /// Loads one account.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AccountNotFound`] for unknown ids,
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn get(&self, id: AccountId) -> Result<Account, LifecycleError>;

    /// Stores a new account together with its first audit entry.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] if the id already exists,
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn insert(&self, account: &Account, audit: &AuditLogEntry)
    -> Result<(), LifecycleError>;

    /// Compare-and-set write of `next`, committed atomically with `audit`.
    ///
    /// Succeeds only if the stored account still matches `expected`. The
    /// stored version becomes `expected.version + 1`; the committed account
    /// is returned.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Conflict`] when the stored state moved on,
    /// [`LifecycleError::AccountNotFound`] for unknown ids,
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn update(
        &self,
        next: &Account,
        expected: Expected,
        audit: &AuditLogEntry,
    ) -> Result<Account, LifecycleError>;

    /// Lists accounts in `status`, ordered by id.
    ///
    /// With `before`, only accounts whose normalised deadline falls at or
    /// before that instant are returned.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn list_by_status(
        &self,
        status: AccountStatus,
        before: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Page<Account>, LifecycleError>;

    /// Number of accounts per status. Statuses with no accounts are omitted.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn count_by_status(&self) -> Result<BTreeMap<AccountStatus, u64>, LifecycleError>;

    /// Number of accounts created at or after `since`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, LifecycleError>;

    /// Number of accounts with a scheduled deletion: a status that can carry
    /// a grace deadline, with `grace_period_ends_at` set.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn count_scheduled_deletions(&self) -> Result<u64, LifecycleError>;

    /// Number of `trial_active` accounts whose trial ends in `(after, until]`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn count_trials_ending_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, LifecycleError>;
}

/// Read side of the audit log.
#[async_trait]
pub trait AuditLogReader: Send + Sync + Debug {
    /// All entries for one account in the order they were written, which
    /// stays exact when two entries share a timestamp.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<AuditLogEntry>, LifecycleError>;

    /// Most recent entries across all accounts, newest first.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, LifecycleError>;
}

/// Append-only ledger of inbound lifecycle events.
#[async_trait]
pub trait EventLedger: Send + Sync + Debug {
    /// Appends one event.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn append(&self, event: &LifecycleEvent) -> Result<(), LifecycleError>;

    /// All events for one account, newest first.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn events_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError>;

    /// Most recent events matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Persistence`] on backend failure.
    async fn recent(
        &self,
        filter: EventSourceFilter,
        limit: usize,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError>;
}
