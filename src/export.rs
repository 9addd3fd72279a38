//! Result materialization and delimited export.

use uuid::Uuid;

use crate::{AirError, Reading};

// ---

/// Flattened query output, ready to be counted, listed or exported.
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    // ---
    pub id: Uuid,
    pub columns: &'a [String],
    pub readings: Vec<&'a Reading>,
}

impl<'a> QueryResult<'a> {
    // ---
    pub fn count(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// UTF-8 CSV with the dataset's header and one row per reading.
    pub fn to_csv(&self) -> Result<Vec<u8>, AirError> {
        write_table(self.columns, self.readings.iter().map(|r| r.cells.as_slice()))
    }
}

pub fn materialize<'a>(columns: &'a [String], readings: Vec<&'a Reading>) -> QueryResult<'a> {
    QueryResult {
        id: Uuid::new_v4(),
        columns,
        readings,
    }
}

/// Serialize a header and rows as comma-delimited UTF-8 text.
pub fn write_table<'r, I>(columns: &[String], rows: I) -> Result<Vec<u8>, AirError>
where
    I: IntoIterator<Item = &'r [String]>,
{
    // ---
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AirError::Export(e.into_error().into()))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::filter::{filter, FilterSpec};
    use crate::grouping::group;
    use crate::store::{load_reader, TableKind};
    use chrono::NaiveDate;

    const SOURCE: &str = "\
Date,Time,CO(GT),NO2(GT),NOx(GT),C6H6(GT),Sensor Note
03/10/2004,18.00.00,2.6,113,166,11.9,\"calm, dry\"
03/10/2004,19.00.00,2,92,103,9.4,
03/11/2004,18.00.00,2.2,114,131,9.0,windy
";

    #[test]
    fn test_materialize_counts_and_keeps_order() {
        // ---
        let dataset = load_reader(SOURCE.as_bytes(), b',', TableKind::Readings, "src").unwrap();
        let result = materialize(&dataset.columns, dataset.readings.iter().rev().collect());

        assert_eq!(result.count(), 3);
        assert_eq!(result.readings[0].time, "18.00.00");
        assert_eq!(result.readings[0].cells[6], "windy");
    }

    #[test]
    fn test_export_is_faithful() {
        // ---
        let dataset = load_reader(SOURCE.as_bytes(), b',', TableKind::Readings, "src").unwrap();
        let result = materialize(&dataset.columns, dataset.readings.iter().collect());
        let csv = String::from_utf8(result.to_csv().unwrap()).unwrap();

        assert_eq!(csv, SOURCE);
    }

    #[test]
    fn test_round_trip_through_full_pipeline() {
        // ---
        let dataset = load_reader(SOURCE.as_bytes(), b',', TableKind::Readings, "src").unwrap();
        let exported = materialize(&dataset.columns, dataset.readings.iter().collect())
            .to_csv()
            .unwrap();

        let reloaded = load_reader(exported.as_slice(), b',', TableKind::Readings, "export").unwrap();
        let (start, end) = reloaded.date_bounds().unwrap();
        let groups = group(&reloaded.readings);
        let selected = filter(&groups, &FilterSpec::DateRange { start, end }).unwrap();
        let result = materialize(&reloaded.columns, selected);

        assert_eq!(result.columns, dataset.columns.as_slice());
        let original: Vec<&Reading> = dataset.readings.iter().collect();
        assert_eq!(result.readings, original);
        assert_eq!(start, NaiveDate::from_ymd_opt(2004, 3, 10).unwrap());
    }

    #[test]
    fn test_empty_result_still_has_header() {
        // ---
        let columns = vec!["Date".to_string(), "Time".to_string()];
        let result = materialize(&columns, Vec::new());

        assert!(result.is_empty());
        assert_eq!(result.to_csv().unwrap(), b"Date,Time\n".to_vec());
    }

    #[test]
    fn test_each_result_gets_its_own_id() {
        // ---
        let columns: Vec<String> = Vec::new();
        let a = materialize(&columns, Vec::new());
        let b = materialize(&columns, Vec::new());
        assert_ne!(a.id, b.id);
    }
}
