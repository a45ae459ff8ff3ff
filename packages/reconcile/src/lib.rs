#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary reconciliation engine.
//!
//! Aligns census variable readings measured on incompatible boundary
//! vintages (e.g. 2010 vs. 2020 tracts) onto one reference partition:
//! computes areal weights by geometric overlay, redistributes additive
//! (extensive) variables by area share, checks that totals are
//! conserved, and compares periods on the aligned table.
//!
//! The engine is a pure transformation over in-memory partitions and
//! readings; fetching lives behind the [`AttributeSource`] and
//! [`GeometrySource`] traits in [`source`].

pub mod align;
pub mod classify;
pub mod compare;
pub mod conserve;
pub mod redistribute;
pub mod source;
pub mod weights;

use census_atlas_geography_models::GeographyLevel;
use thiserror::Error;

pub use align::{AlignRequest, AlignedSeries, align};
pub use classify::classify;
pub use compare::compare;
pub use conserve::validate;
pub use redistribute::redistribute;
pub use source::{AttributeSource, GeometrySource, SourceError};
pub use weights::compute_weights;

/// Relative-error tolerance for conservation checks (0.5%).
pub const DEFAULT_CONSERVATION_TOLERANCE: f64 = 0.005;

/// Errors from the reconciliation engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A variable was classified that is not in the requested set.
    #[error("Unknown variable in classification: {name}")]
    UnknownVariable {
        /// The unrecognized variable name.
        name: String,
    },

    /// A source unit has zero or invalid area (strict mode only; the
    /// default best-effort mode records a
    /// [`WeightIssue`](census_atlas_reconcile_models::WeightIssue)
    /// instead).
    #[error("Degenerate geometry for unit {geoid}")]
    DegenerateGeometry {
        /// The offending unit.
        geoid: String,
    },

    /// The geography level cannot be reconciled across years.
    #[error("Geography level '{level}' cannot be reconciled across years")]
    UnsupportedGeography {
        /// The refused level.
        level: GeographyLevel,
    },

    /// An attribute or geometry fetch returned nothing for a year.
    #[error("No data for year {year}: {detail}")]
    MissingYearData {
        /// The year with no data.
        year: u16,
        /// What was missing.
        detail: String,
    },

    /// The request itself is malformed (empty years, base year not in
    /// the requested years, unknown comparison period, CRS mismatch).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what is wrong.
        message: String,
    },

    /// A collaborator (attribute or geometry source) failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}
