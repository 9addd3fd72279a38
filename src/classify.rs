//! Client for the external pollution-level classifier.
//!
//! The classifier is a black box behind one HTTP endpoint. It receives the
//! four tracked pollutant readings and answers with a class index, which is
//! resolved against the fixed label list `["Trung Bình", "Tốt", "Xấu"]`.
//! Requests with missing features are rejected locally and never sent.

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::models::PREDICTION_COLUMN;
use crate::store::{cell, parse_value, Table};
use crate::{AirError, Pollutant};

// ---

/// Sentinel written for rows the classifier rejected or answered badly.
pub const API_ERROR_SENTINEL: &str = "Lỗi API";

/// Sentinel written for rows that could not be submitted at all.
pub const PROCESSING_ERROR_SENTINEL: &str = "Lỗi xử lý";

/// Pollution level, in the classifier's index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PollutionLabel {
    #[serde(rename = "Trung Bình")]
    Moderate,
    #[serde(rename = "Tốt")]
    Good,
    #[serde(rename = "Xấu")]
    Poor,
}

impl PollutionLabel {
    // ---
    pub const ORDERED: [PollutionLabel; 3] = [
        PollutionLabel::Moderate,
        PollutionLabel::Good,
        PollutionLabel::Poor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PollutionLabel::Moderate => "Trung Bình",
            PollutionLabel::Good => "Tốt",
            PollutionLabel::Poor => "Xấu",
        }
    }

    /// Resolve a class index; anything outside `0..=2` breaks the contract.
    pub fn from_index(index: i64) -> Result<Self, AirError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ORDERED.get(i).copied())
            .ok_or_else(|| AirError::InvalidResponse(format!("class index {index} out of range")))
    }

    pub fn from_label(label: &str) -> Result<Self, AirError> {
        Self::ORDERED
            .into_iter()
            .find(|l| l.as_str() == label)
            .ok_or_else(|| AirError::InvalidResponse(format!("unknown label '{label}'")))
    }
}

/// A complete, validated classification request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Features {
    // ---
    #[serde(rename = "CO(GT)")]
    pub co: f64,
    #[serde(rename = "NO2(GT)")]
    pub no2: f64,
    #[serde(rename = "NOx(GT)")]
    pub nox: f64,
    #[serde(rename = "C6H6(GT)")]
    pub c6h6: f64,
}

impl Features {
    // ---
    /// Build from a lookup; every pollutant must yield a finite number.
    pub fn try_from_fn<F>(mut lookup: F) -> Result<Self, AirError>
    where
        F: FnMut(Pollutant) -> Option<f64>,
    {
        // ---
        let mut values = [0.0; 4];
        let mut missing = Vec::new();
        for pollutant in Pollutant::ALL {
            match lookup(pollutant) {
                Some(v) if v.is_finite() => values[pollutant.slot()] = v,
                _ => missing.push(pollutant.column().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(AirError::MissingFeature(missing));
        }

        Ok(Features {
            co: values[0],
            no2: values[1],
            nox: values[2],
            c6h6: values[3],
        })
    }

    /// Validate a loosely-typed JSON object keyed by column name.
    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, AirError> {
        Self::try_from_fn(|p| payload.get(p.column()).and_then(Value::as_f64))
    }
}

/// Success or error payload from the classifier.
#[derive(Debug, Deserialize)]
struct ClassifierReply {
    prediction: Option<Prediction>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Prediction {
    Index(i64),
    Label(String),
}

/// Turn a raw classifier response into a label.
pub fn interpret_reply(status: StatusCode, body: &str) -> Result<PollutionLabel, AirError> {
    // ---
    let reply: Option<ClassifierReply> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = reply
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(AirError::Service(message));
    }

    match reply {
        Some(ClassifierReply {
            prediction: Some(Prediction::Index(index)),
            ..
        }) => PollutionLabel::from_index(index),
        Some(ClassifierReply {
            prediction: Some(Prediction::Label(label)),
            ..
        }) => PollutionLabel::from_label(&label),
        Some(ClassifierReply {
            error: Some(message),
            ..
        }) => Err(AirError::Service(message)),
        _ => Err(AirError::InvalidResponse(format!(
            "unexpected payload: {body}"
        ))),
    }
}

/// Sentinel text for a failed row.
pub fn sentinel(err: &AirError) -> &'static str {
    match err {
        AirError::Service(_) | AirError::InvalidResponse(_) => API_ERROR_SENTINEL,
        _ => PROCESSING_ERROR_SENTINEL,
    }
}

/// Extract one feature set per row of an uploaded table.
///
/// The table must carry the four pollutant columns. Individual rows with
/// empty or non-numeric cells become per-row errors.
pub fn batch_features(
    table: &Table,
    source_name: &str,
) -> Result<Vec<Result<Features, AirError>>, AirError> {
    // ---
    let columns: Vec<&str> = Pollutant::ALL.iter().map(|p| p.column()).collect();
    let positions = table.require(&columns, source_name)?;

    Ok(table
        .rows
        .iter()
        .map(|row| Features::try_from_fn(|p| parse_value(cell(row, positions[p.slot()]))))
        .collect())
}

/// Append the prediction column, one label or sentinel per row.
pub fn append_predictions(
    mut table: Table,
    outcomes: &[Result<PollutionLabel, AirError>],
) -> Table {
    // ---
    table.columns.push(PREDICTION_COLUMN.to_string());
    for (row, outcome) in table.rows.iter_mut().zip(outcomes) {
        let text = match outcome {
            Ok(label) => label.as_str(),
            Err(e) => sentinel(e),
        };
        row.push(text.to_string());
    }
    table
}

// ---

/// HTTP client for the classification endpoint. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ClassifierClient {
    http: reqwest::Client,
    url: String,
}

impl ClassifierClient {
    // ---
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AirError> {
        // ---
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ClassifierClient {
            http,
            url: url.into(),
        })
    }

    /// One synchronous request/response round-trip.
    pub async fn classify(&self, features: &Features) -> Result<PollutionLabel, AirError> {
        // ---
        debug!("POST {} {:?}", self.url, features);

        let response = self
            .http
            .post(&self.url)
            .json(features)
            .send()
            .await
            .map_err(|e| {
                error!("Classifier unreachable at {}: {}", self.url, e);
                AirError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        interpret_reply(status, &body)
    }

    /// Classify every row, keeping input order.
    ///
    /// Rows that already failed validation pass through untouched. At most
    /// `concurrency` requests are in flight; `1` means strictly sequential.
    pub async fn classify_batch(
        &self,
        rows: Vec<Result<Features, AirError>>,
        concurrency: usize,
    ) -> Vec<Result<PollutionLabel, AirError>> {
        // ---
        stream::iter(rows.into_iter().enumerate())
            .map(|(row_no, row)| async move {
                let outcome = match row {
                    Ok(features) => self.classify(&features).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = &outcome {
                    warn!("Row {} not classified: {}", row_no + 1, e);
                }
                outcome
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
