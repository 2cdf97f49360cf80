//! Lazy, restartable scan over accounts in one status.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{AccountStore, PageRequest};
use crate::domain::{Account, AccountId, AccountStatus};
use crate::error::LifecycleError;

/// Pages through [`AccountStore::list_by_status`] one request at a time.
///
/// The cursor only advances after a page was fetched successfully, so a
/// failed call can simply be retried. A scan can also be resumed from a
/// saved cursor with [`StatusScan::resume_from`].
#[derive(Debug)]
pub struct StatusScan {
    store: Arc<dyn AccountStore>,
    status: AccountStatus,
    before: Option<DateTime<Utc>>,
    page_size: usize,
    cursor: Option<AccountId>,
    exhausted: bool,
}

impl StatusScan {
    /// Starts a scan from the beginning.
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        status: AccountStatus,
        before: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            status,
            before,
            page_size: page_size.max(1),
            cursor: None,
            exhausted: false,
        }
    }

    /// Continues a scan after `cursor`.
    #[must_use]
    pub fn resume_from(mut self, cursor: Option<AccountId>) -> Self {
        self.cursor = cursor;
        self.exhausted = false;
        self
    }

    /// Last id handed out, for resuming later.
    #[must_use]
    pub const fn cursor(&self) -> Option<AccountId> {
        self.cursor
    }

    /// Status being scanned.
    #[must_use]
    pub const fn status(&self) -> AccountStatus {
        self.status
    }

    /// Fetches the next page, or `None` once the scan is complete.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the cursor is left unchanged.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Account>>, LifecycleError> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self
            .store
            .list_by_status(
                self.status,
                self.before,
                PageRequest {
                    after: self.cursor,
                    limit: self.page_size,
                },
            )
            .await?;

        match page.next_cursor {
            Some(next) => self.cursor = Some(next),
            None => {
                self.exhausted = true;
                if let Some(last) = page.items.last() {
                    self.cursor = Some(last.id);
                }
            }
        }

        if page.items.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(page.items))
    }

    /// Drains the remaining pages into one vector.
    ///
    /// # Errors
    ///
    /// Propagates the first store failure.
    pub async fn collect_all(mut self) -> Result<Vec<Account>, LifecycleError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}
