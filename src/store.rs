//! Record store: loads delimited tables into [`Dataset`] snapshots.
//!
//! Loading is lenient about cell contents and strict about structure:
//! - a missing required column or a ragged row fails the whole load with
//!   [`AirError::Parse`]
//! - a `Date` cell that does not match `MM/DD/YYYY` becomes a null date
//! - an empty, non-numeric or NaN pollutant cell becomes a missing value
//!
//! Parsed datasets are memoized per source path by [`DatasetCache`].

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    Dataset, Pollutant, Reading, DATE_COLUMN, DATE_FORMAT, INDEX_COLUMN, LEVEL_COLUMN,
    TIME_COLUMN,
};
use crate::AirError;

// ---

/// A header row plus raw text rows, before any typing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    // ---
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    // ---
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Positions of `names`, or a parse error naming every absent column.
    pub fn require(&self, names: &[&str], source_name: &str) -> Result<Vec<usize>, AirError> {
        // ---
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.position(n).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AirError::parse(
                source_name,
                format!("missing required column(s): {}", missing.join(", ")),
            ));
        }
        Ok(names.iter().filter_map(|n| self.position(n)).collect())
    }
}

/// Which table layout a source is expected to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// `Date`, `Time` and the four pollutant columns.
    Readings,
    /// [`TableKind::Readings`] plus `PollutionLevel`; `PollutionIndex` is
    /// derived when absent.
    Statistics,
}

/// Read a delimited table with a header row.
pub fn read_table<R: Read>(reader: R, delimiter: u8, source_name: &str) -> Result<Table, AirError> {
    // ---
    // Every row must match the header width; a ragged row fails the load.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AirError::parse(source_name, format!("reading header: {e}")))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(AirError::parse(source_name, "empty header row"));
    }

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AirError::parse(source_name, format!("row {}: {e}", row_no + 1)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { columns, rows })
}

/// Cell text at `idx`, empty when the row is short.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", String::as_str)
}

/// Parse a `Date` cell, coercing anything off-format to `None`.
///
/// The year must be written with exactly four digits; chrono's `%Y` alone
/// would accept `03/10/04` as year 4.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    // ---
    let cell = cell.trim();
    let year = cell.rsplit('/').next()?;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(cell, DATE_FORMAT).ok()
}

/// Parse a numeric cell; empty, malformed and NaN cells are missing.
pub fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn parse_level(cell: &str) -> Option<i64> {
    // ---
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        parse_value(cell)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// Type a raw table as readings.
pub fn dataset_from_table(
    mut table: Table,
    kind: TableKind,
    source_name: &str,
) -> Result<Dataset, AirError> {
    // ---
    let mut required = vec![DATE_COLUMN, TIME_COLUMN];
    required.extend(Pollutant::ALL.iter().map(|p| p.column()));
    if kind == TableKind::Statistics {
        required.push(LEVEL_COLUMN);
    }
    let positions = table.require(&required, source_name)?;
    let (date_idx, time_idx) = (positions[0], positions[1]);
    let pollutant_idx = [positions[2], positions[3], positions[4], positions[5]];
    let level_idx = table.position(LEVEL_COLUMN);
    let index_idx = table.position(INDEX_COLUMN);

    let derive_index = kind == TableKind::Statistics && index_idx.is_none();
    if derive_index {
        table.columns.push(INDEX_COLUMN.to_string());
    }

    let mut readings = Vec::with_capacity(table.rows.len());
    for mut cells in table.rows {
        let mut measurements = [None; 4];
        for (slot, &idx) in pollutant_idx.iter().enumerate() {
            measurements[slot] = parse_value(cell(&cells, idx));
        }

        let mut reading = Reading {
            date: parse_date(cell(&cells, date_idx)),
            time: cell(&cells, time_idx).to_string(),
            measurements,
            pollution_level: level_idx.and_then(|i| parse_level(cell(&cells, i))),
            pollution_index: index_idx.and_then(|i| parse_value(cell(&cells, i))),
            cells: Vec::new(),
        };

        if derive_index {
            reading.pollution_index = reading.mean_measurement();
            cells.push(reading.pollution_index.map(|v| v.to_string()).unwrap_or_default());
        }
        reading.cells = cells;
        readings.push(reading);
    }

    Ok(Dataset {
        columns: table.columns,
        readings,
    })
}

/// Load a dataset from any reader.
pub fn load_reader<R: Read>(
    reader: R,
    delimiter: u8,
    kind: TableKind,
    source_name: &str,
) -> Result<Dataset, AirError> {
    // ---
    let table = read_table(reader, delimiter, source_name)?;
    let dataset = dataset_from_table(table, kind, source_name)?;

    let null_dates = dataset.readings.iter().filter(|r| r.date.is_none()).count();
    info!(
        "Loaded {} readings from {} ({} with unparseable date)",
        dataset.len(),
        source_name,
        null_dates
    );
    Ok(dataset)
}

/// Load a dataset from a file on disk.
pub fn load_path(path: &Path, delimiter: u8, kind: TableKind) -> Result<Dataset, AirError> {
    // ---
    let source_name = path.display().to_string();
    let file = File::open(path).map_err(|e| AirError::parse(&source_name, e))?;
    load_reader(file, delimiter, kind, &source_name)
}

// ---

/// Process-wide memo of parsed datasets, keyed by source path and layout.
///
/// Entries live for the lifetime of the cache. Failed loads are not
/// remembered, so a corrected file is picked up on the next call.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<(PathBuf, TableKind), Arc<Dataset>>>,
}

impl DatasetCache {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &self,
        path: &Path,
        delimiter: u8,
        kind: TableKind,
    ) -> Result<Arc<Dataset>, AirError> {
        // ---
        let key = (
            path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            kind,
        );

        if let Some(dataset) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            debug!("Dataset cache hit for {}", key.0.display());
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(load_path(path, delimiter, kind)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(dataset)))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
