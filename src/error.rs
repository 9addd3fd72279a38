//! Error taxonomy for the query engine and the classification client.
//!
//! Every variant is recoverable: handlers turn it into a JSON body of the
//! form `{"error": "<message>"}` with the status code from
//! [`AirError::status`]. Nothing here terminates the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum AirError {
    /// Source table unreadable or structurally incompatible.
    #[error("failed to parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// `start > end` or `min > max`, rejected before any data is scanned.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Classification request is incomplete; it is never transmitted.
    #[error("missing or non-numeric feature(s): {}", .0.join(", "))]
    MissingFeature(Vec<String>),

    /// The classifier answered, but outside of its contract.
    #[error("classifier returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The classifier answered with a structured error payload.
    #[error("classifier reported an error: {0}")]
    Service(String),

    /// Timeout, refused connection or any other transport failure.
    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode export: {0}")]
    Export(#[from] csv::Error),

    /// A blocking dataset load panicked or was cancelled.
    #[error("dataset load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AirError {
    // ---
    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        AirError::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status equivalent of this error.
    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            AirError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AirError::InvalidRange(_) | AirError::MissingFeature(_) => StatusCode::BAD_REQUEST,
            AirError::InvalidResponse(_)
            | AirError::Service(_)
            | AirError::Transport(_)
            | AirError::Export(_)
            | AirError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AirError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_mapping() {
        // ---
        assert_eq!(
            AirError::parse("data.csv", "bad header").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AirError::InvalidRange("min > max".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AirError::MissingFeature(vec!["C6H6(GT)".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AirError::InvalidResponse("index 5".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AirError::Service("model not loaded".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_failed_load_task_is_server_error() {
        // ---
        let join_err = tokio::task::spawn_blocking(|| panic!("loader crashed"))
            .await
            .unwrap_err();
        let err = AirError::from(join_err);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("dataset load task failed"));
    }

    #[test]
    fn test_missing_feature_message_lists_columns() {
        // ---
        let err = AirError::MissingFeature(vec!["NOx(GT)".into(), "C6H6(GT)".into()]);
        assert_eq!(
            err.to_string(),
            "missing or non-numeric feature(s): NOx(GT), C6H6(GT)"
        );
    }
}
