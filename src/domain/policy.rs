//! Lifecycle timing policy.

use chrono::Duration;

use super::ExtensionDays;
use crate::error::LifecycleError;

/// Window lengths and limits that drive every deadline calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Length of the free trial granted at signup.
    pub trial_length: Duration,
    /// Time between losing access and deletion.
    pub grace_period: Duration,
    /// How long before deletion an account enters `grace_period`.
    pub deletion_notice: Duration,
    /// Upper bound on a single trial or grace extension.
    pub max_extension_days: u32,
}

impl LifecyclePolicy {
    /// Rejects extensions above the configured ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] if `days` exceeds
    /// `max_extension_days`.
    pub fn check_extension(&self, days: ExtensionDays) -> Result<(), LifecycleError> {
        if days.get() > self.max_extension_days {
            return Err(LifecycleError::Validation(format!(
                "extension of {} days exceeds the maximum of {}",
                days.get(),
                self.max_extension_days
            )));
        }
        Ok(())
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            trial_length: Duration::days(14),
            grace_period: Duration::days(30),
            deletion_notice: Duration::days(7),
            max_extension_days: 365,
        }
    }
}
