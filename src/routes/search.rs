use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::AppState;
use crate::export::{materialize, QueryResult};
use crate::filter::{filter, FilterSpec};
use crate::grouping::group;
use crate::{AirError, Dataset, Pollutant};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/search", get(search))
        .route("/search/export", get(export))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Date,
    Value,
}

/// Query parameters for `/search` and `/search/export`.
///
/// Omitted bounds default to the dataset's own extent.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    by: FilterMode,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    pollutant: Option<Pollutant>,
    min: Option<f64>,
    max: Option<f64>,
}

impl SearchQuery {
    // ---
    /// Resolve to a concrete filter; `None` when the dataset has nothing
    /// the chosen mode could ever match.
    fn to_filter(&self, dataset: &Dataset) -> Option<FilterSpec> {
        // ---
        match self.by {
            FilterMode::Date => {
                let bounds = dataset.date_bounds();
                Some(FilterSpec::DateRange {
                    start: self.start.or(bounds.map(|b| b.0))?,
                    end: self.end.or(bounds.map(|b| b.1))?,
                })
            }
            FilterMode::Value => {
                let pollutant = self.pollutant.unwrap_or(Pollutant::Co);
                let bounds = dataset.value_bounds(pollutant);
                Some(FilterSpec::ValueRange {
                    pollutant,
                    min: self.min.or(bounds.map(|b| b.0))?,
                    max: self.max.or(bounds.map(|b| b.1))?,
                })
            }
        }
    }
}

fn run_query<'a>(dataset: &'a Dataset, query: &SearchQuery) -> Result<QueryResult<'a>, AirError> {
    // ---
    let Some(spec) = query.to_filter(dataset) else {
        debug!("No bounds derivable for {:?}, returning empty result", query);
        return Ok(materialize(&dataset.columns, Vec::new()));
    };
    spec.validate()?;

    let groups = group(&dataset.readings);
    let selected = filter(&groups, &spec)?;
    let result = materialize(&dataset.columns, selected);

    info!(
        "Query {} ({}) matched {} of {} readings in {} groups",
        result.id,
        spec,
        result.count(),
        dataset.len(),
        groups.len()
    );
    Ok(result)
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query_id: Uuid,
    count: usize,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl From<&QueryResult<'_>> for SearchResponse {
    fn from(result: &QueryResult<'_>) -> Self {
        SearchResponse {
            query_id: result.id,
            count: result.count(),
            columns: result.columns.to_vec(),
            rows: result.readings.iter().map(|r| r.cells.clone()).collect(),
        }
    }
}

async fn search(
    Query(query): Query<SearchQuery>,
    State(state): State<AppState>,
) -> Result<Json<SearchResponse>, AirError> {
    // ---
    info!("GET /search - {:?}", query);
    let dataset = state.search_dataset().await?;
    let result = run_query(&dataset, &query)?;
    Ok(Json(SearchResponse::from(&result)))
}

async fn export(
    Query(query): Query<SearchQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AirError> {
    // ---
    info!("GET /search/export - {:?}", query);
    let dataset = state.search_dataset().await?;
    let csv = run_query(&dataset, &query)?.to_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"filtered_data.csv\"",
            ),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::{load_reader, TableKind};

    const TABLE: &str = "\
Date,Time,CO(GT),NO2(GT),NOx(GT),C6H6(GT)
01/01/2024,00.00.00,1.0,2.0,3.0,0.5
01/02/2024,00.00.00,5.0,6.0,7.0,1.0
";

    fn dataset() -> Dataset {
        load_reader(TABLE.as_bytes(), b',', TableKind::Readings, "search").unwrap()
    }

    fn query(by: FilterMode) -> SearchQuery {
        SearchQuery {
            by,
            start: None,
            end: None,
            pollutant: None,
            min: None,
            max: None,
        }
    }

    #[test]
    fn test_omitted_bounds_default_to_dataset_extent() {
        // ---
        let dataset = dataset();

        let spec = query(FilterMode::Date).to_filter(&dataset).unwrap();
        assert_eq!(
            spec,
            FilterSpec::DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            }
        );

        let mut by_value = query(FilterMode::Value);
        by_value.pollutant = Some(Pollutant::Nox);
        by_value.max = Some(5.0);
        assert_eq!(
            by_value.to_filter(&dataset).unwrap(),
            FilterSpec::ValueRange {
                pollutant: Pollutant::Nox,
                min: 3.0,
                max: 5.0,
            }
        );
    }

    #[test]
    fn test_run_query_value_range() {
        // ---
        let dataset = dataset();
        let mut q = query(FilterMode::Value);
        q.min = Some(0.0);
        q.max = Some(2.0);

        let result = run_query(&dataset, &q).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.readings[0].cells[0], "01/01/2024");
    }

    #[test]
    fn test_run_query_rejects_inverted_range() {
        // ---
        let dataset = dataset();
        let mut q = query(FilterMode::Date);
        q.start = NaiveDate::from_ymd_opt(2024, 2, 1);
        q.end = NaiveDate::from_ymd_opt(2024, 1, 1);

        assert!(matches!(
            run_query(&dataset, &q),
            Err(AirError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_empty_dataset_yields_empty_result() {
        // ---
        let empty = Dataset::default();
        let result = run_query(&empty, &query(FilterMode::Date)).unwrap();
        assert!(result.is_empty());
    }
}
