//! Data model for air-quality readings.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---

pub const DATE_COLUMN: &str = "Date";
pub const TIME_COLUMN: &str = "Time";
pub const LEVEL_COLUMN: &str = "PollutionLevel";
pub const INDEX_COLUMN: &str = "PollutionIndex";
pub const PREDICTION_COLUMN: &str = "Dự đoán";

/// External date format of the `Date` column (`MM/DD/YYYY`).
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// The four tracked pollutants, in the order the classifier expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "CO(GT)", alias = "CO")]
    Co,
    #[serde(rename = "NO2(GT)", alias = "NO2")]
    No2,
    #[serde(rename = "NOx(GT)", alias = "NOx")]
    Nox,
    #[serde(rename = "C6H6(GT)", alias = "C6H6")]
    C6h6,
}

impl Pollutant {
    // ---
    pub const ALL: [Pollutant; 4] = [Pollutant::Co, Pollutant::No2, Pollutant::Nox, Pollutant::C6h6];

    /// Column name in the tabular source.
    pub fn column(self) -> &'static str {
        match self {
            Pollutant::Co => "CO(GT)",
            Pollutant::No2 => "NO2(GT)",
            Pollutant::Nox => "NOx(GT)",
            Pollutant::C6h6 => "C6H6(GT)",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One timestamped sensor record.
///
/// `cells` keeps the row's original text for every column of the owning
/// [`Dataset`], so exports reproduce the source faithfully. The typed
/// fields are parsed views over those cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    // ---
    /// `None` when the source cell did not match [`DATE_FORMAT`].
    pub date: Option<NaiveDate>,
    pub time: String,
    /// Indexed by [`Pollutant`]; missing or NaN cells are `None`.
    pub measurements: [Option<f64>; 4],
    pub pollution_level: Option<i64>,
    pub pollution_index: Option<f64>,
    pub cells: Vec<String>,
}

impl Reading {
    // ---
    pub fn measurement(&self, pollutant: Pollutant) -> Option<f64> {
        self.measurements[pollutant.slot()]
    }

    /// Row-wise mean of the tracked pollutants, skipping missing values.
    pub fn mean_measurement(&self) -> Option<f64> {
        // ---
        let present: Vec<f64> = self.measurements.iter().flatten().copied().collect();
        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

/// An immutable, ordered snapshot of a loaded table.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    // ---
    pub columns: Vec<String>,
    pub readings: Vec<Reading>,
}

impl Dataset {
    // ---
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Earliest and latest non-null date.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        // ---
        let mut dates = self.readings.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Smallest and largest measurement of `pollutant`.
    pub fn value_bounds(&self, pollutant: Pollutant) -> Option<(f64, f64)> {
        // ---
        let mut values = self.readings.iter().filter_map(|r| r.measurement(pollutant));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reading(date: Option<NaiveDate>, co: Option<f64>, no2: Option<f64>) -> Reading {
        // ---
        Reading {
            date,
            time: "18.00.00".to_string(),
            measurements: [co, no2, None, None],
            pollution_level: None,
            pollution_index: None,
            cells: Vec::new(),
        }
    }

    #[test]
    fn test_pollutant_columns() {
        // ---
        let columns: Vec<&str> = Pollutant::ALL.iter().map(|p| p.column()).collect();
        assert_eq!(columns, vec!["CO(GT)", "NO2(GT)", "NOx(GT)", "C6H6(GT)"]);
        assert_eq!(Pollutant::Nox.to_string(), "NOx(GT)");
    }

    #[test]
    fn test_pollutant_accepts_short_names() {
        // ---
        let long: Pollutant = serde_json::from_str("\"C6H6(GT)\"").unwrap();
        let short: Pollutant = serde_json::from_str("\"C6H6\"").unwrap();
        assert_eq!(long, Pollutant::C6h6);
        assert_eq!(short, Pollutant::C6h6);
    }

    #[test]
    fn test_mean_skips_missing() {
        // ---
        let r = reading(None, Some(1.0), Some(3.0));
        assert_eq!(r.mean_measurement(), Some(2.0));

        let empty = reading(None, None, None);
        assert_eq!(empty.mean_measurement(), None);
    }

    #[test]
    fn test_bounds_ignore_nulls() {
        // ---
        let d1 = NaiveDate::from_ymd_opt(2004, 3, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2004, 3, 12).unwrap();
        let dataset = Dataset {
            columns: Vec::new(),
            readings: vec![
                reading(Some(d2), Some(2.6), None),
                reading(None, None, Some(4.0)),
                reading(Some(d1), Some(0.4), None),
            ],
        };

        assert_eq!(dataset.date_bounds(), Some((d1, d2)));
        assert_eq!(dataset.value_bounds(Pollutant::Co), Some((0.4, 2.6)));
        assert_eq!(dataset.value_bounds(Pollutant::No2), Some((4.0, 4.0)));
        assert_eq!(dataset.value_bounds(Pollutant::Nox), None);
    }
}
