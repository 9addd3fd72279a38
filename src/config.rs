//! Configuration loader for the `airsense-query` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Table served by the search endpoints.
    pub search_dataset: PathBuf,

    /// Table with `PollutionLevel` served by the statistics endpoint.
    pub stats_dataset: PathBuf,

    /// Field delimiter of source tables and uploads.
    pub delimiter: u8,

    /// Classification endpoint.
    pub classifier_url: String,

    /// Per-request classifier timeout, in seconds.
    pub classifier_timeout_secs: u32,

    /// Batch rows classified concurrently; 1 is strictly sequential.
    pub batch_concurrency: u32,

    /// HTTP listen address.
    pub bind_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SEARCH_DATASET_PATH` – searchable table (default: `timkiem.csv`)
/// - `STATS_DATASET_PATH` – statistics table (default: `thongke.csv`)
/// - `DATASET_DELIMITER` – single-byte field delimiter (default: `,`)
/// - `CLASSIFIER_URL` – classifier endpoint (default: `http://127.0.0.1:5000/predict`)
/// - `CLASSIFIER_TIMEOUT_SECS` – request timeout (default: 10)
/// - `BATCH_CONCURRENCY` – in-flight batch rows (default: 1)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let search_dataset = PathBuf::from(env_or!("SEARCH_DATASET_PATH", "timkiem.csv"));
    let stats_dataset = PathBuf::from(env_or!("STATS_DATASET_PATH", "thongke.csv"));
    let delimiter = parse_delimiter(&env_or!("DATASET_DELIMITER", ","))?;
    let classifier_url = env_or!("CLASSIFIER_URL", "http://127.0.0.1:5000/predict");
    let classifier_timeout_secs = parse_env_u32!("CLASSIFIER_TIMEOUT_SECS", 10);
    let batch_concurrency = parse_env_u32!("BATCH_CONCURRENCY", 1);
    let bind_addr = env_or!("BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?;

    if batch_concurrency == 0 {
        bail!("Invalid BATCH_CONCURRENCY: must be at least 1");
    }
    if classifier_timeout_secs == 0 {
        bail!("Invalid CLASSIFIER_TIMEOUT_SECS: must be at least 1");
    }

    Ok(Config {
        search_dataset,
        stats_dataset,
        delimiter,
        classifier_url,
        classifier_timeout_secs,
        batch_concurrency,
        bind_addr,
    })
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    // ---
    match raw.as_bytes() {
        [b] => Ok(*b),
        _ if raw == "\\t" => Ok(b'\t'),
        _ => Err(anyhow!(
            "Invalid DATASET_DELIMITER: expected a single byte, got '{}'",
            raw
        )),
    }
}

impl Config {
    // ---
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.classifier_timeout_secs))
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SEARCH_DATASET_PATH     : {}", self.search_dataset.display());
        tracing::info!("  STATS_DATASET_PATH      : {}", self.stats_dataset.display());
        tracing::info!("  DATASET_DELIMITER       : {:?}", self.delimiter as char);
        tracing::info!("  CLASSIFIER_URL          : {}", self.classifier_url);
        tracing::info!("  CLASSIFIER_TIMEOUT_SECS : {}", self.classifier_timeout_secs);
        tracing::info!("  BATCH_CONCURRENCY       : {}", self.batch_concurrency);
        tracing::info!("  BIND_ADDR               : {}", self.bind_addr);
    }
}
