//! Range filtering over grouped readings.
//!
//! Two mutually exclusive modes, both closed intervals:
//! - [`FilterSpec::DateRange`] selects whole groups whose key date is in range
//! - [`FilterSpec::ValueRange`] selects individual readings within each group
//!   whose measurement of one pollutant is in range
//!
//! Null dates and missing measurements never match.

use std::fmt;

use chrono::NaiveDate;

use crate::grouping::GroupedReadings;
use crate::{AirError, Pollutant, Reading};

// ---

#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    DateRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    ValueRange {
        pollutant: Pollutant,
        min: f64,
        max: f64,
    },
}

impl FilterSpec {
    // ---
    /// Reject inverted bounds. NaN bounds are rejected as well.
    pub fn validate(&self) -> Result<(), AirError> {
        // ---
        match *self {
            FilterSpec::DateRange { start, end } if start > end => Err(AirError::InvalidRange(
                format!("start date {start} is after end date {end}"),
            )),
            FilterSpec::ValueRange {
                pollutant,
                min,
                max,
            } if !(min <= max) => Err(AirError::InvalidRange(format!(
                "minimum {min} of {pollutant} is greater than maximum {max}"
            ))),
            _ => Ok(()),
        }
    }

    /// Whether a single reading satisfies the predicate.
    pub fn matches(&self, reading: &Reading) -> bool {
        // ---
        match *self {
            FilterSpec::DateRange { start, end } => reading
                .date
                .is_some_and(|date| start <= date && date <= end),
            FilterSpec::ValueRange {
                pollutant,
                min,
                max,
            } => reading
                .measurement(pollutant)
                .is_some_and(|value| min <= value && value <= max),
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::DateRange { start, end } => write!(f, "date in [{start}, {end}]"),
            FilterSpec::ValueRange {
                pollutant,
                min,
                max,
            } => write!(f, "{pollutant} in [{min}, {max}]"),
        }
    }
}

/// Select readings from `groups`, flattened in group order.
///
/// Validation runs first; an inverted range never touches the data.
pub fn filter<'a>(
    groups: &GroupedReadings<'a>,
    spec: &FilterSpec,
) -> Result<Vec<&'a Reading>, AirError> {
    // ---
    spec.validate()?;

    let selected = match spec {
        FilterSpec::DateRange { start, end } => groups
            .iter()
            .filter(|g| g.key.date.is_some_and(|d| *start <= d && d <= *end))
            .flat_map(|g| g.readings.iter().copied())
            .collect(),
        FilterSpec::ValueRange { .. } => groups
            .iter()
            .flat_map(move |g| g.readings.iter().copied().filter(move |r| spec.matches(r)))
            .collect(),
    };

    Ok(selected)
}
