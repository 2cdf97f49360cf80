//! Privileged, reason-justified overrides.
//!
//! Each command checks privilege first, then input policy, and only then
//! calls into the [`TransitionEngine`]. A rejected command never touches the
//! store.

use std::sync::Arc;

use crate::domain::{Account, AccountId, Actor, AdminId, ExtensionDays, Reason};
use crate::error::LifecycleError;
use crate::service::{Authorizer, TransitionEngine};

/// Administrative command surface.
#[derive(Debug, Clone)]
pub struct AdminCommands {
    engine: Arc<TransitionEngine>,
    authorizer: Arc<dyn Authorizer>,
}

impl AdminCommands {
    /// Creates the command surface.
    #[must_use]
    pub fn new(engine: Arc<TransitionEngine>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { engine, authorizer }
    }

    async fn authorize(&self, admin: &AdminId) -> Result<Actor, LifecycleError> {
        self.authorizer.require_administrator(admin).await?;
        Ok(Actor::Admin(admin.clone()))
    }

    /// Extends a running trial by `days` from its current end.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`], [`LifecycleError::Validation`] when
    /// `days` exceeds policy, or any engine error.
    pub async fn extend_trial(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        days: ExtensionDays,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine.policy().check_extension(days)?;
        self.engine
            .extend_trial(account_id, days, &actor, reason)
            .await
    }

    /// Grants premium access.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] or any engine error.
    pub async fn activate_premium(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine
            .activate_premium(account_id, &actor, reason)
            .await
    }

    /// Cancels premium and schedules deletion.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] or any engine error.
    pub async fn deactivate_premium(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine
            .deactivate_premium(account_id, &actor, reason)
            .await
    }

    /// Entry point for the payment-processor consumer after a cancellation
    /// or payment-failure signal. Runs as the system actor with reason
    /// `automated: <event_type>`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] if the derived reason is too long, or
    /// any engine error.
    pub async fn deactivate_premium_automated(
        &self,
        account_id: AccountId,
        event_type: &str,
    ) -> Result<Account, LifecycleError> {
        let reason = Reason::new(format!("automated: {}", event_type.trim()))?;
        self.engine
            .deactivate_premium(account_id, &Actor::System, &reason)
            .await
    }

    /// Clears a scheduled deletion.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] or any engine error.
    pub async fn cancel_deletion(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine
            .cancel_deletion(account_id, &actor, reason)
            .await
    }

    /// Pushes a scheduled deletion back by `days`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`], [`LifecycleError::Validation`] when
    /// `days` exceeds policy, or any engine error.
    pub async fn extend_grace_period(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        days: ExtensionDays,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine.policy().check_extension(days)?;
        self.engine
            .extend_grace_period(account_id, days, &actor, reason)
            .await
    }

    /// Blocks an account.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] or any engine error.
    pub async fn suspend(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine.suspend(account_id, &actor, reason).await
    }

    /// Lifts a suspension.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Forbidden`] or any engine error.
    pub async fn reinstate(
        &self,
        admin: &AdminId,
        account_id: AccountId,
        reason: &Reason,
    ) -> Result<Account, LifecycleError> {
        let actor = self.authorize(admin).await?;
        self.engine.reinstate(account_id, &actor, reason).await
    }
}
