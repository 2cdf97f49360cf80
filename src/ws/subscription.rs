//! Per-connection subscription filter.
//!
//! Tracks which accounts and actions a WebSocket client follows and decides
//! server-side whether an audit entry is forwarded.

use std::collections::HashSet;

use crate::domain::{AccountId, ActionType, AuditLogEntry};

/// Subscription state for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed accounts. Ignored while `subscribe_all` is set.
    account_ids: HashSet<AccountId>,
    /// Wildcard `"*"` subscription.
    subscribe_all: bool,
    /// Action filter; empty forwards every action.
    actions: HashSet<ActionType>,
}

impl SubscriptionManager {
    /// Creates an empty manager that matches nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows `ids`, or every account when `wildcard` is set.
    ///
    /// A non-empty `actions` list replaces the current action filter.
    pub fn subscribe(&mut self, ids: &[AccountId], wildcard: bool, actions: &[ActionType]) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.account_ids.extend(ids.iter().copied());
        if !actions.is_empty() {
            self.actions = actions.iter().copied().collect();
        }
    }

    /// Stops following `ids`; `wildcard` clears the `"*"` subscription.
    pub fn unsubscribe(&mut self, ids: &[AccountId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.account_ids.remove(id);
        }
    }

    /// Returns `true` if `entry` should be forwarded.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        let account_match =
            self.subscribe_all || self.account_ids.contains(&entry.target_account_id);
        let action_match = self.actions.is_empty() || self.actions.contains(&entry.action_type);
        account_match && action_match
    }

    /// Number of explicitly followed accounts.
    #[must_use]
    pub fn count(&self) -> usize {
        self.account_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
