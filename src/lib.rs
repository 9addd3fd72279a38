//! Query, export and classification engine for air-quality sensor readings.
//!
//! Data flows leaf-first through the modules:
//! ```text
//!   store ──► grouping ──► filter ──► export
//!   (load)    (date,time)   (range)    (count, CSV)
//!
//!   classify: features ──► external classifier ──► label
//! ```
//! `routes` exposes the pipeline over HTTP; `main.rs` only wires process
//! concerns (tracing, `.env`, configuration, listener).
//!
//! Modules reach each other through the re-exports below rather than
//! through each other's paths, so moving a type only touches this file.

pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod grouping;
pub mod models;
pub mod routes;
pub mod stats;
pub mod store;

pub use config::Config;
pub use error::AirError;
pub use models::{Dataset, Pollutant, Reading};
