use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::AppState;
use crate::classify::{append_predictions, batch_features, Features, PollutionLabel};
use crate::export::write_table;
use crate::store::read_table;
use crate::AirError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: PollutionLabel,
}

/// Classify one manually entered feature set.
async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<PredictResponse>, AirError> {
    // ---
    let features = Features::from_json(&payload)?;
    let prediction = state.classifier.classify(&features).await?;
    info!("POST /predict - {:?} -> {}", features, prediction.as_str());
    Ok(Json(PredictResponse { prediction }))
}

/// Classify every row of an uploaded CSV and return it with a prediction column.
async fn predict_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AirError> {
    // ---
    let table = read_table(body.as_ref(), state.config.delimiter, "upload")?;
    let rows = batch_features(&table, "upload")?;
    info!("POST /predict/batch - classifying {} rows", rows.len());

    let concurrency = state.config.batch_concurrency as usize;
    let outcomes = state.classifier.classify_batch(rows, concurrency).await;
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    info!(
        "POST /predict/batch - {} classified, {} failed",
        outcomes.len() - failed,
        failed
    );

    let labelled = append_predictions(table, &outcomes);
    let csv = write_table(&labelled.columns, labelled.rows.iter().map(Vec::as_slice))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"predictions.csv\"",
            ),
        ],
        csv,
    ))
}
