//! PostgreSQL implementation of the persistence traits.
//!
//! Schema lives in `migrations/`. Each transition is one transaction: a
//! conditional `UPDATE ... WHERE id AND status AND version`, the audit
//! `INSERT`, then `COMMIT`. If the `UPDATE` matches no row, the transaction
//! is rolled back and no audit entry exists.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{ACCOUNT_COLUMNS, AccountRow, AuditRow, EventRow};
use super::{AccountStore, AuditLogReader, EventLedger, Expected, Page, PageRequest};
use crate::config::LifecycleConfig;
use crate::domain::{
    Account, AccountId, AccountStatus, AuditLogEntry, EventSourceFilter, LifecycleEvent,
};
use crate::error::LifecycleError;

fn db_err(e: sqlx::Error) -> LifecycleError {
    LifecycleError::Persistence(e.to_string())
}

fn to_i64(value: u64) -> Result<i64, LifecycleError> {
    i64::try_from(value).map_err(|_| LifecycleError::Persistence(format!("{value} overflows i64")))
}

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool with the configured limits and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Persistence`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &LifecycleConfig) -> Result<Self, LifecycleError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(db_err)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| LifecycleError::Persistence(e.to_string()))?;

        Ok(Self::new(pool))
    }

    async fn insert_audit(
        tx: &mut Transaction<'_, Postgres>,
        audit: &AuditLogEntry,
    ) -> Result<(), LifecycleError> {
        sqlx::query(
            "INSERT INTO audit_log (id, target_account_id, actor_id, action_type, reason, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(audit.id)
        .bind(*audit.target_account_id.as_uuid())
        .bind(&audit.actor_id)
        .bind(audit.action_type.as_str())
        .bind(&audit.reason)
        .bind(&audit.details)
        .bind(audit.created_at)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn get(&self, id: AccountId) -> Result<Account, LifecycleError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.ok_or(LifecycleError::AccountNotFound(id))?.try_into()
    }

    async fn insert(
        &self,
        account: &Account,
        audit: &AuditLogEntry,
    ) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let inserted = sqlx::query(
            "INSERT INTO accounts (id, status, trial_started_at, trial_ends_at, premium_since, \
             grace_period_ends_at, grace_origin, suspended_from, next_deadline_at, deadline_kind, \
             created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(*account.id.as_uuid())
        .bind(account.status.as_str())
        .bind(account.trial_started_at)
        .bind(account.trial_ends_at)
        .bind(account.premium_since)
        .bind(account.grace_period_ends_at)
        .bind(account.grace_origin.map(|s| s.as_str()))
        .bind(account.suspended_from.map(|s| s.as_str()))
        .bind(account.next_deadline.map(|d| d.at))
        .bind(account.next_deadline.map(|d| d.kind.as_str()))
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(to_i64(account.version)?)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if inserted.rows_affected() == 0 {
            return Err(LifecycleError::Validation(format!(
                "account {} already exists",
                account.id
            )));
        }

        Self::insert_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(db_err)
    }

    async fn update(
        &self,
        next: &Account,
        expected: Expected,
        audit: &AuditLogEntry,
    ) -> Result<Account, LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET status = $2, trial_ends_at = $3, premium_since = $4, \
             grace_period_ends_at = $5, grace_origin = $6, suspended_from = $7, \
             next_deadline_at = $8, deadline_kind = $9, updated_at = $10, version = version + 1 \
             WHERE id = $1 AND status = $11 AND version = $12 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(*next.id.as_uuid())
        .bind(next.status.as_str())
        .bind(next.trial_ends_at)
        .bind(next.premium_since)
        .bind(next.grace_period_ends_at)
        .bind(next.grace_origin.map(|s| s.as_str()))
        .bind(next.suspended_from.map(|s| s.as_str()))
        .bind(next.next_deadline.map(|d| d.at))
        .bind(next.next_deadline.map(|d| d.kind.as_str()))
        .bind(next.updated_at)
        .bind(expected.status.as_str())
        .bind(to_i64(expected.version)?)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
                    .bind(*next.id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_err)?;
            tx.rollback().await.map_err(db_err)?;
            return Err(if exists {
                LifecycleError::Conflict {
                    account_id: next.id,
                    expected: expected.status,
                }
            } else {
                LifecycleError::AccountNotFound(next.id)
            });
        };

        Self::insert_audit(&mut tx, audit).await?;
        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    async fn list_by_status(
        &self,
        status: AccountStatus,
        before: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Page<Account>, LifecycleError> {
        let limit = to_i64(page.limit as u64)?;
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE status = $1 \
               AND ($2::timestamptz IS NULL OR next_deadline_at <= $2) \
               AND ($3::uuid IS NULL OR id > $3) \
             ORDER BY id ASC LIMIT $4"
        ))
        .bind(status.as_str())
        .bind(before)
        .bind(page.after.map(uuid::Uuid::from))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let items = rows
            .into_iter()
            .map(Account::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let next_cursor = if items.len() == page.limit {
            items.last().map(|account| account.id)
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }

    async fn count_by_status(&self) -> Result<BTreeMap<AccountStatus, u64>, LifecycleError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM accounts GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut counts = BTreeMap::new();
        for (status, count) in rows {
            let status: AccountStatus = status
                .parse()
                .map_err(|_| LifecycleError::Persistence(format!("corrupt status: {status}")))?;
            counts.insert(status, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, LifecycleError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_scheduled_deletions(&self) -> Result<u64, LifecycleError> {
        let statuses: Vec<&str> = AccountStatus::ALL
            .into_iter()
            .filter(AccountStatus::can_carry_grace)
            .map(|status| status.as_str())
            .collect();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts \
             WHERE status = ANY($1) AND grace_period_ends_at IS NOT NULL",
        )
        .bind(statuses)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn count_trials_ending_between(
        &self,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, LifecycleError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts \
             WHERE status = $1 AND trial_ends_at > $2 AND trial_ends_at <= $3",
        )
        .bind(AccountStatus::TrialActive.as_str())
        .bind(after)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl AuditLogReader for PostgresStore {
    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<AuditLogEntry>, LifecycleError> {
        sqlx::query_as::<_, AuditRow>(
            "SELECT id, target_account_id, actor_id, action_type, reason, details, created_at \
             FROM audit_log WHERE target_account_id = $1 ORDER BY seq ASC",
        )
        .bind(*account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(AuditLogEntry::try_from)
        .collect()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, LifecycleError> {
        sqlx::query_as::<_, AuditRow>(
            "SELECT id, target_account_id, actor_id, action_type, reason, details, created_at \
             FROM audit_log ORDER BY seq DESC LIMIT $1",
        )
        .bind(to_i64(limit as u64)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(AuditLogEntry::try_from)
        .collect()
    }
}

#[async_trait]
impl EventLedger for PostgresStore {
    async fn append(&self, event: &LifecycleEvent) -> Result<(), LifecycleError> {
        sqlx::query(
            "INSERT INTO lifecycle_events (id, account_id, event_type, external_reference, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id)
        .bind(*event.account_id.as_uuid())
        .bind(&event.event_type)
        .bind(&event.external_reference)
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn events_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, account_id, event_type, external_reference, metadata, created_at \
             FROM lifecycle_events WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(*account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(LifecycleEvent::from).collect())
    }

    async fn recent(
        &self,
        filter: EventSourceFilter,
        limit: usize,
    ) -> Result<Vec<LifecycleEvent>, LifecycleError> {
        let source_clause = match filter {
            EventSourceFilter::All => "",
            EventSourceFilter::Processor => {
                "WHERE external_reference IS NOT NULL AND external_reference <> ''"
            }
            EventSourceFilter::Manual => {
                "WHERE external_reference IS NULL OR external_reference = ''"
            }
        };
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT id, account_id, event_type, external_reference, metadata, created_at \
             FROM lifecycle_events {source_clause} ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(to_i64(limit as u64)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(LifecycleEvent::from).collect())
    }
}
