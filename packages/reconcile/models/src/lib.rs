#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data types produced and consumed by the boundary reconciliation
//! engine: areal weights, the canonical reconciled table, conservation
//! diagnostics, and period comparison rows.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// How a variable behaves under area-weighted redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableClass {
    /// Additive quantity (count, total); redistributable by area weight.
    Extensive,
    /// Rate, median, or other non-additive quantity; never redistributed.
    Intensive,
}

/// Caller-supplied classification of logical variable names.
pub type VariableClassification = BTreeMap<String, VariableClass>;

/// Raw variable codes to request per year, keyed by logical name.
///
/// Decennial codes are renumbered between census cycles ("P001001" in
/// 2010 became "`P1_001N`" in 2020), so the per-year form lets one
/// logical name resolve to a different code each year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum VariableMap {
    /// Same code for every requested year.
    Uniform(BTreeMap<String, String>),
    /// Codes specified separately per year.
    PerYear(BTreeMap<u16, BTreeMap<String, String>>),
}

impl VariableMap {
    /// Resolves the logical-name → code mapping for one year.
    ///
    /// `None` when the per-year form has no entry for the year.
    #[must_use]
    pub fn codes_for_year(&self, year: u16) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Uniform(codes) => Some(codes),
            Self::PerYear(by_year) => by_year.get(&year),
        }
    }

    /// All logical variable names named anywhere in the map.
    #[must_use]
    pub fn logical_names(&self) -> BTreeSet<String> {
        match self {
            Self::Uniform(codes) => codes.keys().cloned().collect(),
            Self::PerYear(by_year) => by_year
                .values()
                .flat_map(|codes| codes.keys().cloned())
                .collect(),
        }
    }
}

/// One variable reading keyed by logical name, as fed to the
/// redistribution engine after raw-code resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableReading {
    /// Source unit GEOID.
    pub geoid: String,
    /// Data year.
    pub year: u16,
    /// Logical variable name.
    pub variable: String,
    /// Value; `None` is the missing marker and must propagate.
    pub value: Option<f64>,
}

/// One sparse weight matrix entry: the fraction of a source unit's area
/// falling inside a target unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    /// Source unit GEOID.
    pub source_geoid: String,
    /// Target unit GEOID.
    pub target_geoid: String,
    /// Fraction of the source unit's area, in `[0, 1]`.
    pub weight: f64,
}

/// Per-unit problem found while computing weights. Collected and
/// reported, never silently absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum WeightIssue {
    /// Source unit with zero or invalid area; skipped in best-effort mode.
    DegenerateGeometry {
        /// Offending source unit.
        geoid: String,
    },
    /// Source unit intersecting no target unit; its readings cannot be
    /// redistributed and its area is unaccounted for.
    Unmatched {
        /// Offending source unit.
        geoid: String,
    },
}

/// Sparse areal weight matrix plus the per-unit issues found while
/// building it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaWeights {
    /// Entries sorted by (source, target) GEOID.
    pub entries: Vec<WeightEntry>,
    /// Units skipped or left unmatched during computation.
    pub issues: Vec<WeightIssue>,
}

impl AreaWeights {
    /// Identity weighting: every GEOID maps to itself with weight 1.0.
    pub fn identity<'a>(geoids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entries: geoids
                .into_iter()
                .map(|geoid| WeightEntry {
                    source_geoid: geoid.to_string(),
                    target_geoid: geoid.to_string(),
                    weight: 1.0,
                })
                .collect(),
            issues: Vec::new(),
        }
    }

    /// Whether this is an identity weighting: every entry maps a unit
    /// to itself with weight 1.0. Intensive variables may pass through
    /// redistribution only under identity weights.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.source_geoid == entry.target_geoid && entry.weight == 1.0)
    }

    /// Sum of outgoing weights per source unit.
    ///
    /// For gap-free input geometry every sum is 1.0 within tolerance;
    /// anything else means source area was dropped or double-counted.
    #[must_use]
    pub fn source_weight_sums(&self) -> BTreeMap<&str, f64> {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in &self.entries {
            *sums.entry(entry.source_geoid.as_str()).or_insert(0.0) += entry.weight;
        }
        sums
    }
}

/// Key of one cell in the reconciled table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    /// Target-partition unit GEOID.
    pub geoid: String,
    /// Data year the value describes.
    pub year: u16,
    /// Logical variable name.
    pub variable: String,
}

/// One reconciled value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// The value; `None` when it is entirely missing.
    pub value: Option<f64>,
    /// True when at least one contributing source reading was missing,
    /// so the value understates the true total.
    pub partial: bool,
}

impl Cell {
    /// A complete (non-partial) value.
    #[must_use]
    pub const fn complete(value: f64) -> Self {
        Self {
            value: Some(value),
            partial: false,
        }
    }

    /// A wholly missing value.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            value: None,
            partial: true,
        }
    }
}

/// Canonical normalized output of the engine: (unit, year, variable) →
/// value, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledTable {
    cells: BTreeMap<CellKey, Cell>,
}

impl ReconciledTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// Inserts or replaces a cell.
    pub fn insert(&mut self, key: CellKey, cell: Cell) {
        self.cells.insert(key, cell);
    }

    /// Looks up a cell.
    #[must_use]
    pub fn get(&self, geoid: &str, year: u16, variable: &str) -> Option<&Cell> {
        self.cells.get(&CellKey {
            geoid: geoid.to_string(),
            year,
            variable: variable.to_string(),
        })
    }

    /// Iterates cells in (geoid, year, variable) order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &Cell)> {
        self.cells.iter()
    }

    /// Absorbs all cells from another table.
    pub fn extend(&mut self, other: Self) {
        self.cells.extend(other.cells);
    }

    /// Distinct years present.
    #[must_use]
    pub fn years(&self) -> BTreeSet<u16> {
        self.cells.keys().map(|key| key.year).collect()
    }

    /// Distinct logical variable names present.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        self.cells.keys().map(|key| key.variable.as_str()).collect()
    }

    /// Distinct unit GEOIDs present in one year.
    #[must_use]
    pub fn geoids_in_year(&self, year: u16) -> BTreeSet<&str> {
        self.cells
            .keys()
            .filter(|key| key.year == year)
            .map(|key| key.geoid.as_str())
            .collect()
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the table holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Non-fatal data-quality signal: an extensive variable's total changed
/// by more than the tolerance during redistribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConservationWarning {
    /// Logical variable name.
    pub variable: String,
    /// Data year checked.
    pub year: u16,
    /// Sum over source units (missing readings excluded).
    pub source_total: f64,
    /// Sum over reconciled target units.
    pub target_total: f64,
    /// `|target - source| / |source|`.
    pub relative_error: f64,
}

/// Change metrics for one variable within a [`ComparisonRow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChange {
    /// Value in the base period.
    pub base: Option<f64>,
    /// Value in the comparison period.
    pub comparison: Option<f64>,
    /// `comparison - base`; `None` when either side is missing.
    pub change: Option<f64>,
    /// `change / base * 100`; `None` when the base is zero or missing.
    pub percent_change: Option<f64>,
}

/// Per-unit output of a period comparison. One row per target unit
/// present in both periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    /// Target unit GEOID.
    pub geoid: String,
    /// Change metrics keyed by logical variable name.
    pub changes: BTreeMap<String, VariableChange>,
}
