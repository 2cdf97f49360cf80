//! Request bodies for administrative commands.
//!
//! Fields are optional at the JSON level so that a missing `reason` or a
//! non-positive `days` surfaces as a structured validation error instead of
//! a deserialization rejection.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{ExtensionDays, Reason};
use crate::error::LifecycleError;

/// Body for commands that only need a justification.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReasonRequest {
    /// Free-text justification (required, max 1000 characters).
    #[serde(default)]
    pub reason: Option<String>,
}

impl ReasonRequest {
    /// Validates the reason.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] when the reason is missing or invalid.
    pub fn validate(&self) -> Result<Reason, LifecycleError> {
        Reason::from_field(self.reason.as_deref())
    }
}

/// Body for `extend-trial` and `extend-grace-period`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ExtensionRequest {
    /// Days to add to the current deadline (positive).
    #[serde(default)]
    pub days: Option<i64>,
    /// Free-text justification (required, max 1000 characters).
    #[serde(default)]
    pub reason: Option<String>,
}

impl ExtensionRequest {
    /// Validates both fields.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] when either field is missing or invalid.
    pub fn validate(&self) -> Result<(ExtensionDays, Reason), LifecycleError> {
        let days = self
            .days
            .ok_or_else(|| LifecycleError::Validation("days is required".to_string()))
            .and_then(ExtensionDays::new)?;
        let reason = Reason::from_field(self.reason.as_deref())?;
        Ok((days, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn missing_reason_is_a_validation_error() {
        assert!(matches!(
            ReasonRequest::default().validate(),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn extension_requires_positive_days() {
        for days in [None, Some(0), Some(-3)] {
            let request = ExtensionRequest {
                days,
                reason: Some("ok".to_string()),
            };
            assert_err!(request.validate(), "{days:?}");
        }
        let request = ExtensionRequest {
            days: Some(7),
            reason: Some(" support case ".to_string()),
        };
        let (days, reason) = assert_ok!(request.validate());
        assert_eq!(days.get(), 7);
        assert_eq!(reason.as_str(), "support case");
    }
}
