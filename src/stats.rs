//! Overview statistics over the statistics table variant.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{Dataset, Pollutant, Reading};

// ---

/// `PollutionLevel` codes as labelled by the statistics table itself.
///
/// This ordering belongs to the table and differs from the classifier's
/// index order in [`crate::classify::PollutionLabel`].
pub fn level_label(code: i64) -> String {
    match code {
        0 => "Tốt".to_string(),
        1 => "Trung bình".to_string(),
        2 => "Xấu".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    // ---
    pub row_count: usize,
    pub most_polluted_date: Option<NaiveDate>,
    pub least_polluted_date: Option<NaiveDate>,
    pub means: BTreeMap<Pollutant, Option<f64>>,
    pub level_counts: BTreeMap<String, usize>,
}

pub fn summarize(dataset: &Dataset) -> Summary {
    // ---
    let indexed: Vec<(NaiveDate, f64)> = dataset
        .readings
        .iter()
        .filter_map(|r| Some((r.date?, r.pollution_index?)))
        .collect();

    let most_polluted_date = indexed
        .iter()
        .fold(None::<(NaiveDate, f64)>, |best, &(d, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((d, v)),
        })
        .map(|(d, _)| d);
    let least_polluted_date = indexed
        .iter()
        .fold(None::<(NaiveDate, f64)>, |best, &(d, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((d, v)),
        })
        .map(|(d, _)| d);

    let means = Pollutant::ALL
        .iter()
        .map(|&p| (p, mean(dataset.readings.iter(), p)))
        .collect();

    let mut level_counts = BTreeMap::new();
    for code in dataset.readings.iter().filter_map(|r| r.pollution_level) {
        *level_counts.entry(level_label(code)).or_insert(0) += 1;
    }

    Summary {
        row_count: dataset.len(),
        most_polluted_date,
        least_polluted_date,
        means,
        level_counts,
    }
}

fn mean<'a>(readings: impl Iterator<Item = &'a Reading>, pollutant: Pollutant) -> Option<f64> {
    // ---
    let (sum, n) = readings
        .filter_map(|r| r.measurement(pollutant))
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::{load_reader, TableKind};

    const TABLE: &str = "\
Date,Time,CO(GT),NO2(GT),NOx(GT),C6H6(GT),PollutionLevel
03/10/2004,18.00.00,1,2,3,2,0
03/11/2004,18.00.00,4,8,12,8,2
03/12/2004,18.00.00,4,8,12,8,2
bad-date,18.00.00,100,100,100,100,1
03/13/2004,18.00.00,2,,4,,1
";

    #[test]
    fn test_summary() {
        // ---
        let dataset = load_reader(TABLE.as_bytes(), b',', TableKind::Statistics, "stats").unwrap();
        let summary = summarize(&dataset);

        assert_eq!(summary.row_count, 5);
        // Ties keep the first occurrence; undated rows are skipped.
        assert_eq!(summary.most_polluted_date, NaiveDate::from_ymd_opt(2004, 3, 11));
        assert_eq!(summary.least_polluted_date, NaiveDate::from_ymd_opt(2004, 3, 10));

        assert_eq!(summary.means[&Pollutant::Co], Some(22.2));
        assert_eq!(summary.means[&Pollutant::No2], Some(29.5));

        assert_eq!(summary.level_counts["Tốt"], 1);
        assert_eq!(summary.level_counts["Trung bình"], 2);
        assert_eq!(summary.level_counts["Xấu"], 2);
    }

    #[test]
    fn test_unknown_level_code_keeps_its_number() {
        // ---
        assert_eq!(level_label(7), "7");
    }

    #[test]
    fn test_empty_dataset() {
        // ---
        let summary = summarize(&Dataset::default());
        assert_eq!(summary.row_count, 0);
        assert_eq!(summary.most_polluted_date, None);
        assert!(summary.means.values().all(Option::is_none));
        assert!(summary.level_counts.is_empty());
    }
}
