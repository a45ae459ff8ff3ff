#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census Data API client.
//!
//! Fetches tabular variable readings from `api.census.gov` for ACS and
//! Decennial datasets and decodes them into
//! [`AttributeRow`](census_atlas_attributes_models::AttributeRow)
//! records, including the ACS sentinel missing-value codes.

pub mod api;

use census_atlas_reconcile::SourceError;
use thiserror::Error;

pub use api::CensusApiClient;

/// Errors from the Census Data API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body was not in the expected shape.
    #[error("Response error: {message}")]
    Response {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<ApiError> for SourceError {
    fn from(err: ApiError) -> Self {
        Self::new("census data api", err.to_string())
    }
}
