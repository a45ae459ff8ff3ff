#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census boundary fetching.
//!
//! Downloads boundary polygons from the Census Bureau `TIGERweb` REST
//! API as `GeoJSON` and assembles them into
//! [`Partition`](census_atlas_geography_models::Partition)s for the
//! reconciliation engine.

pub mod tiger;

use census_atlas_reconcile::SourceError;
use thiserror::Error;

pub use tiger::TigerClient;

/// Errors that can occur during boundary operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<GeoError> for SourceError {
    fn from(err: GeoError) -> Self {
        Self::new("tigerweb", err.to_string())
    }
}
