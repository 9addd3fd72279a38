use axum::{extract::State, routing::get, Json, Router};
use tracing::info;

use super::AppState;
use crate::stats::{summarize, Summary};
use crate::AirError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/stats", get(handler))
}

async fn handler(State(state): State<AppState>) -> Result<Json<Summary>, AirError> {
    // ---
    let dataset = state.stats_dataset().await?;
    let summary = summarize(&dataset);
    info!("GET /stats - summarized {} rows", summary.row_count);
    Ok(Json(summary))
}
