//! Collaborator seams: where variable readings and boundary polygons
//! come from.
//!
//! The engine never fetches anything itself; callers hand it an
//! [`AttributeSource`] and a [`GeometrySource`]. The HTTP clients in
//! `census_atlas_attributes` and `census_atlas_geography` implement
//! these, and tests substitute in-memory fixtures.

use async_trait::async_trait;
use census_atlas_attributes_models::{AttributeRow, Dataset, GeographyFilters};
use census_atlas_geography_models::{GeographyLevel, Partition};
use thiserror::Error;

/// Failure inside an attribute or geometry source collaborator.
///
/// Carries the collaborator's own rendering of the failure; the engine
/// does not interpret it beyond propagating.
#[derive(Debug, Error)]
#[error("{collaborator}: {message}")]
pub struct SourceError {
    /// Which collaborator failed (e.g. "census data api", "tigerweb").
    pub collaborator: String,
    /// Collaborator-rendered failure description.
    pub message: String,
}

impl SourceError {
    /// Creates a source error.
    pub fn new(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

/// Supplies raw tabular variable readings for one (level, year,
/// dataset) request.
#[async_trait]
pub trait AttributeSource: Send + Sync {
    /// Fetches readings for the given raw variable codes.
    async fn fetch_attributes(
        &self,
        level: GeographyLevel,
        year: u16,
        dataset: Dataset,
        variable_codes: &[String],
        filters: &GeographyFilters,
    ) -> Result<Vec<AttributeRow>, SourceError>;
}

/// Supplies the boundary partition for one (level, year) request.
#[async_trait]
pub trait GeometrySource: Send + Sync {
    /// Fetches the partition, with geometries in the source's native
    /// CRS (the engine projects before overlay).
    async fn fetch_geometry(
        &self,
        level: GeographyLevel,
        year: u16,
        filters: &GeographyFilters,
    ) -> Result<Partition, SourceError>;
}
