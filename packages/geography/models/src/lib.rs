#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic partition and boundary types.
//!
//! A [`Partition`] is the full set of non-overlapping units (tracts,
//! counties, ...) covering a region for one year and geography level.
//! Boundary reconciliation works on pairs of partitions, so identity
//! detection ([`Partition::same_units`]) and CRS tracking live here.

pub mod fips;
pub mod project;

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Census geography levels supported by the data and boundary APIs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum GeographyLevel {
    State,
    County,
    Tract,
    BlockGroup,
    Block,
    Region,
    Division,
    Place,
    Zcta,
}

impl GeographyLevel {
    /// Geography name as used in the Census API `for`/`in` clauses.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::County => "county",
            Self::Tract => "tract",
            Self::BlockGroup => "block group",
            Self::Block => "block",
            Self::Region => "region",
            Self::Division => "division",
            Self::Place => "place",
            Self::Zcta => "zip code tabulation area",
        }
    }

    /// Whether boundaries at this level can be treated as unchanged
    /// across the given span of years.
    ///
    /// States, regions, and divisions never move. County boundaries
    /// rarely change, so short spans skip the overlay entirely. Tract,
    /// block group, and block boundaries are redrawn every census cycle.
    #[must_use]
    pub const fn boundaries_stable(self, span_years: u16) -> bool {
        match self {
            Self::State | Self::Region | Self::Division => true,
            Self::County => span_years < 20,
            Self::Tract | Self::BlockGroup | Self::Block | Self::Place | Self::Zcta => false,
        }
    }

    /// Whether cross-year reconciliation is supported for this level.
    ///
    /// ZCTA vintages are redrawn unpredictably and share no stable
    /// crosswalk, so area interpolation between them is refused.
    #[must_use]
    pub const fn reconcilable(self) -> bool {
        !matches!(self, Self::Zcta)
    }
}

/// Coordinate reference system a partition's geometries are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Crs {
    /// Longitude/latitude degrees (WGS84 / EPSG:4326), as served by `TIGERweb`.
    Geographic,
    /// Planar meters under the built-in Albers equal-area projection.
    EqualArea,
}

/// One geographic unit: a stable identifier plus its boundary polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicUnit {
    /// Census GEOID (e.g. "11001000100" for a DC tract).
    pub geoid: String,
    /// Human-readable name, when the source supplies one.
    pub name: Option<String>,
    /// Boundary geometry in the owning partition's CRS.
    pub geometry: MultiPolygon<f64>,
}

/// The full set of non-overlapping units covering a region for one
/// (year, level) combination.
///
/// Units are keyed by GEOID in a `BTreeMap` so iteration order is
/// deterministic, which keeps weight computation and redistribution
/// reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Geography level of every unit in this partition.
    pub level: GeographyLevel,
    /// Vintage year the boundaries were drawn for.
    pub year: u16,
    /// CRS the unit geometries are currently expressed in.
    pub crs: Crs,
    units: BTreeMap<String, GeographicUnit>,
}

impl Partition {
    /// Creates an empty partition.
    #[must_use]
    pub const fn new(level: GeographyLevel, year: u16, crs: Crs) -> Self {
        Self {
            level,
            year,
            crs,
            units: BTreeMap::new(),
        }
    }

    /// Builds a partition from an iterator of units.
    ///
    /// Later units replace earlier ones with the same GEOID.
    pub fn from_units(
        level: GeographyLevel,
        year: u16,
        crs: Crs,
        units: impl IntoIterator<Item = GeographicUnit>,
    ) -> Self {
        let mut partition = Self::new(level, year, crs);
        for unit in units {
            partition.insert(unit);
        }
        partition
    }

    /// Inserts a unit, replacing any existing unit with the same GEOID.
    pub fn insert(&mut self, unit: GeographicUnit) {
        self.units.insert(unit.geoid.clone(), unit);
    }

    /// Looks up a unit by GEOID.
    #[must_use]
    pub fn get(&self, geoid: &str) -> Option<&GeographicUnit> {
        self.units.get(geoid)
    }

    /// Iterates units in GEOID order.
    pub fn units(&self) -> impl Iterator<Item = &GeographicUnit> {
        self.units.values()
    }

    /// Iterates GEOIDs in sorted order.
    pub fn geoids(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Number of units in the partition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the partition contains no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether two partitions describe the identical set of units:
    /// same level, same vintage year, same GEOIDs.
    ///
    /// Used to short-circuit geometric overlay when boundaries have
    /// not changed between the compared vintages.
    #[must_use]
    pub fn same_units(&self, other: &Self) -> bool {
        self.level == other.level
            && self.year == other.year
            && self.units.len() == other.units.len()
            && self.units.keys().eq(other.units.keys())
    }

    /// Whether two partitions cover the same GEOIDs at the same level,
    /// regardless of vintage year.
    ///
    /// An unchanged GEOID set across vintages means the boundaries were
    /// carried forward, so overlay can be skipped in favor of identity
    /// weights.
    #[must_use]
    pub fn same_geoids(&self, other: &Self) -> bool {
        self.level == other.level
            && self.units.len() == other.units.len()
            && self.units.keys().eq(other.units.keys())
    }

    /// Returns a copy of this partition with every geometry projected
    /// into the built-in Albers equal-area CRS.
    ///
    /// Already-projected partitions are returned unchanged.
    #[must_use]
    pub fn to_equal_area(&self) -> Self {
        if self.crs == Crs::EqualArea {
            return self.clone();
        }

        let units = self.units.values().map(|unit| GeographicUnit {
            geoid: unit.geoid.clone(),
            name: unit.name.clone(),
            geometry: project::albers_equal_area(&unit.geometry),
        });

        Self::from_units(self.level, self.year, Crs::EqualArea, units)
    }
}
