//! Dosage schedules and dose observations.
//!
//! These are the two halves of a reminder candidate: the standing plan
//! ([`Dosage`]) and the most recent concrete event ([`Dose`]).

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::types::Timestamp;

/// Nanoseconds in one day, as a float for fractional conversion.
const NANOS_PER_DAY: f64 = 86_400.0 * 1_000_000_000.0;

/// A number of days, possibly fractional. `Days(1.5)` is 36 hours.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Days(pub f64);

impl Days {
    /// Convert to a duration, truncated to whole nanoseconds.
    pub fn to_duration(self) -> chrono::Duration {
        chrono::Duration::nanoseconds((self.0 * NANOS_PER_DAY) as i64)
    }
}

impl From<f64> for Days {
    fn from(days: f64) -> Self {
        Self(days)
    }
}

/// A user's standing dosage schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Dosage {
    /// Delivery method tag, e.g. `"patch"` or `"injection"`.
    #[validate(length(min = 1, max = 64))]
    pub delivery_method: String,
    /// Amount delivered per dose.
    #[validate(range(exclusive_min = 0.0))]
    pub dose: f32,
    /// Time between doses.
    #[validate(custom(function = "validate_interval"))]
    pub interval: Days,
    /// Number of patches worn at once. Only meaningful for patches.
    #[validate(range(min = 1))]
    pub concurrence: Option<i32>,
}

fn validate_interval(interval: &Days) -> Result<(), ValidationError> {
    if interval.0.is_finite() && interval.0 > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("interval_must_be_positive"))
    }
}

/// One recorded dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dose {
    /// Delivery method at the time the dose was taken.
    pub delivery_method: String,
    pub dose: f32,
    pub taken_at: Timestamp,
    /// When a patch-style dose was removed, if it was.
    pub taken_off_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(interval: f64) -> Dosage {
        Dosage {
            delivery_method: "patch".into(),
            dose: 100.0,
            interval: Days(interval),
            concurrence: Some(2),
        }
    }

    // -----------------------------------------------------------------------
    // Days
    // -----------------------------------------------------------------------

    #[test]
    fn one_day_is_twenty_four_hours() {
        assert_eq!(Days(1.0).to_duration(), chrono::Duration::hours(24));
    }

    #[test]
    fn fractional_days_convert() {
        assert_eq!(Days(1.5).to_duration(), chrono::Duration::hours(36));
        assert_eq!(Days(0.25).to_duration(), chrono::Duration::hours(6));
    }

    #[test]
    fn days_deserialize_from_bare_number() {
        let days: Days = serde_json::from_str("3.5").unwrap();
        assert_eq!(days, Days(3.5));
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn valid_schedule_passes() {
        assert!(schedule(3.5).validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let errors = schedule(0.0).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("interval"));
    }

    #[test]
    fn nan_interval_rejected() {
        assert!(schedule(f64::NAN).validate().is_err());
    }

    #[test]
    fn zero_concurrence_rejected() {
        let mut dosage = schedule(1.0);
        dosage.concurrence = Some(0);
        let errors = dosage.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("concurrence"));
    }

    #[test]
    fn non_positive_dose_rejected() {
        let mut dosage = schedule(1.0);
        dosage.dose = 0.0;
        assert!(dosage.validate().is_err());
    }
}
