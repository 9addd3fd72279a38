//! Route gateway: merges every sub-router and owns the shared state.
//!
//! Each sibling module exports a `router()` over [`AppState`]; callers only
//! see [`router`].
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;

use crate::classify::ClassifierClient;
use crate::store::{DatasetCache, TableKind};
use crate::{AirError, Config, Dataset};

mod health;
mod predict;
mod search;
mod stats;

// ---

/// State shared by all handlers. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    // ---
    pub config: Arc<Config>,
    pub datasets: Arc<DatasetCache>,
    pub classifier: ClassifierClient,
}

impl AppState {
    // ---
    pub fn new(config: Config) -> Result<Self, AirError> {
        // ---
        let classifier = ClassifierClient::new(&config.classifier_url, config.classifier_timeout())?;
        Ok(AppState {
            config: Arc::new(config),
            datasets: Arc::new(DatasetCache::new()),
            classifier,
        })
    }

    pub(crate) async fn search_dataset(&self) -> Result<Arc<Dataset>, AirError> {
        self.dataset(self.config.search_dataset.clone(), TableKind::Readings)
            .await
    }

    pub(crate) async fn stats_dataset(&self) -> Result<Arc<Dataset>, AirError> {
        self.dataset(self.config.stats_dataset.clone(), TableKind::Statistics)
            .await
    }

    /// Cache lookup, run on the blocking pool: a miss reads the whole file.
    async fn dataset(&self, path: PathBuf, kind: TableKind) -> Result<Arc<Dataset>, AirError> {
        // ---
        let datasets = Arc::clone(&self.datasets);
        let delimiter = self.config.delimiter;
        tokio::task::spawn_blocking(move || datasets.get_or_load(&path, delimiter, kind)).await?
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(search::router())
        .merge(predict::router())
        .merge(stats::router())
        .merge(health::router())
        .with_state(state)
}
