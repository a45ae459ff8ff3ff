#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output shaping for the reconciled table.
//!
//! The engine always produces one canonical normalized table; this
//! crate projects it into the two common presentation shapes: tidy
//! (one row per unit × year × variable) and wide (one row per unit,
//! one column per year × variable pair).

use std::collections::BTreeSet;

use census_atlas_reconcile_models::ReconciledTable;
use serde::{Deserialize, Serialize};

/// One row of the tidy (long) projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidyRow {
    /// Unit GEOID.
    pub geoid: String,
    /// Data year.
    pub year: u16,
    /// Logical variable name.
    pub variable: String,
    /// Value, if present.
    pub value: Option<f64>,
    /// Whether the value was flagged partial during redistribution.
    pub partial: bool,
}

/// The wide projection: units as rows, (year, variable) pairs as
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WideTable {
    /// Column keys in order: sorted (year, variable) pairs.
    pub columns: Vec<(u16, String)>,
    /// One row per unit, GEOID-sorted.
    pub rows: Vec<WideRow>,
}

/// One row of the wide projection; `values` aligns with the table's
/// `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WideRow {
    /// Unit GEOID.
    pub geoid: String,
    /// Cell values in column order; `None` for absent cells.
    pub values: Vec<Option<f64>>,
}

/// Projects the table into tidy rows, in (geoid, year, variable) order.
#[must_use]
pub fn to_tidy(table: &ReconciledTable) -> Vec<TidyRow> {
    table
        .iter()
        .map(|(key, cell)| TidyRow {
            geoid: key.geoid.clone(),
            year: key.year,
            variable: key.variable.clone(),
            value: cell.value,
            partial: cell.partial,
        })
        .collect()
}

/// Projects the table into wide rows with sorted (year, variable)
/// columns. Cells missing from the table come out as `None`.
#[must_use]
pub fn to_wide(table: &ReconciledTable) -> WideTable {
    let mut columns: BTreeSet<(u16, String)> = BTreeSet::new();
    let mut geoids: BTreeSet<&str> = BTreeSet::new();
    for (key, _) in table.iter() {
        columns.insert((key.year, key.variable.clone()));
        geoids.insert(key.geoid.as_str());
    }
    let columns: Vec<(u16, String)> = columns.into_iter().collect();

    let rows = geoids
        .into_iter()
        .map(|geoid| WideRow {
            geoid: geoid.to_string(),
            values: columns
                .iter()
                .map(|(year, variable)| {
                    table.get(geoid, *year, variable).and_then(|cell| cell.value)
                })
                .collect(),
        })
        .collect();

    WideTable { columns, rows }
}
