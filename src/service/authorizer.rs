//! Administrator privilege check.
//!
//! Authentication happens upstream; by the time a command arrives the
//! caller's [`AdminId`] is known. The [`Authorizer`] only answers whether
//! that id may run privileged commands. Any doubt means "no".

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::{AdminId, SYSTEM_ACTOR};
use crate::error::LifecycleError;

/// Port deciding whether a caller holds administrator privilege.
#[async_trait]
pub trait Authorizer: Send + Sync + Debug {
    /// Returns `true` if `admin` may run administrative commands.
    async fn is_administrator(&self, admin: &AdminId) -> bool;

    /// Fails with [`LifecycleError::Forbidden`] unless `admin` is privileged.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] when the check fails.
    async fn require_administrator(&self, admin: &AdminId) -> Result<(), LifecycleError> {
        if self.is_administrator(admin).await {
            Ok(())
        } else {
            tracing::warn!(admin = %admin, "administrative command rejected");
            Err(LifecycleError::Forbidden(format!(
                "{admin} is not an administrator"
            )))
        }
    }
}

/// Static allow-list of administrator ids, typically from `ADMIN_IDS`.
#[derive(Debug, Clone, Default)]
pub struct AllowListAuthorizer {
    admins: HashSet<String>,
}

impl AllowListAuthorizer {
    /// Builds an allow-list from ids. Blank entries are ignored, and so is
    /// the reserved [`SYSTEM_ACTOR`].
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_string())
            .filter(|id| !id.is_empty())
            .filter(|id| {
                let reserved = id.eq_ignore_ascii_case(SYSTEM_ACTOR);
                if reserved {
                    tracing::warn!(admin = %id, "reserved actor id ignored in allow-list");
                }
                !reserved
            })
            .collect();
        Self { admins }
    }

    /// Number of configured administrators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    /// Returns `true` if no administrator is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

#[async_trait]
impl Authorizer for AllowListAuthorizer {
    async fn is_administrator(&self, admin: &AdminId) -> bool {
        self.admins.contains(admin.as_str())
    }
}
