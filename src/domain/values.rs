//! Validated inputs for administrative commands.
//!
//! Both types can only be built through their fallible constructors, so a
//! command that holds one has already passed input validation.

use std::fmt;

use serde::Serialize;

use crate::error::LifecycleError;

/// Maximum accepted length of a justification, in characters.
pub const MAX_REASON_LEN: usize = 1000;

/// Free-text justification attached to an administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reason(String);

impl Reason {
    /// Builds a reason from user input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] if the trimmed text is empty
    /// or longer than [`MAX_REASON_LEN`] characters.
    pub fn new(text: impl AsRef<str>) -> Result<Self, LifecycleError> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LifecycleError::Validation("reason is required".to_string()));
        }
        if trimmed.chars().count() > MAX_REASON_LEN {
            return Err(LifecycleError::Validation(format!(
                "reason must be at most {MAX_REASON_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Builds a reason from an optional request field.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] when the field is missing or
    /// fails [`Reason::new`].
    pub fn from_field(text: Option<&str>) -> Result<Self, LifecycleError> {
        text.map_or_else(
            || Err(LifecycleError::Validation("reason is required".to_string())),
            Self::new,
        )
    }

    /// Returns the justification text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positive number of days by which a deadline is pushed forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExtensionDays(u32);

impl ExtensionDays {
    /// Validates a day count.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] if `days` is zero or negative.
    pub fn new(days: i64) -> Result<Self, LifecycleError> {
        if days <= 0 {
            return Err(LifecycleError::Validation(format!(
                "days must be a positive integer, got {days}"
            )));
        }
        u32::try_from(days)
            .map(Self)
            .map_err(|_| LifecycleError::Validation(format!("days out of range: {days}")))
    }

    /// Returns the day count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the extension as a [`chrono::Duration`].
    #[must_use]
    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn reason_is_trimmed() {
        let Ok(reason) = Reason::new("  support case  ") else {
            panic!("valid reason rejected");
        };
        assert_eq!(reason.as_str(), "support case");
    }

    #[test]
    fn blank_reason_is_rejected() {
        assert!(Reason::new("   ").is_err());
        assert!(Reason::from_field(None).is_err());
    }

    #[test]
    fn overlong_reason_is_rejected() {
        let text = "x".repeat(MAX_REASON_LEN + 1);
        assert!(Reason::new(text).is_err());
        assert!(Reason::new("x".repeat(MAX_REASON_LEN)).is_ok());
    }

    #[test]
    fn days_must_be_positive() {
        assert!(ExtensionDays::new(0).is_err());
        assert!(ExtensionDays::new(-7).is_err());
        assert_eq!(ExtensionDays::new(7).map(ExtensionDays::get).ok(), Some(7));
    }

    #[test]
    fn days_above_u32_are_rejected() {
        assert!(ExtensionDays::new(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn duration_matches_day_count() {
        let Ok(days) = ExtensionDays::new(14) else {
            panic!("valid days rejected");
        };
        assert_eq!(days.as_duration(), chrono::Duration::days(14));
    }
}
