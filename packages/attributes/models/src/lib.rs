#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and reading types for the Census Data API.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Census dataset families the attribute source can query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum Dataset {
    /// ACS 5-year estimates.
    Acs5,
    /// ACS 1-year estimates.
    Acs1,
    /// Decennial census.
    Decennial,
}

impl Dataset {
    /// API path segment for this dataset in a given year.
    ///
    /// Decennial endpoints moved from the SF1 summary file to the PL
    /// redistricting file with the 2020 census.
    #[must_use]
    pub const fn api_path(self, year: u16) -> &'static str {
        match self {
            Self::Acs5 => "acs/acs5",
            Self::Acs1 => "acs/acs1",
            Self::Decennial => {
                if year >= 2020 {
                    "dec/pl"
                } else {
                    "dec/sf1"
                }
            }
        }
    }
}

/// State/county scoping for a data or boundary request.
///
/// Values are FIPS codes ("06", "037"). An empty filter requests the
/// full national extent, which most levels reject server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographyFilters {
    /// Two-digit state FIPS code.
    pub state: Option<String>,
    /// Three-digit county FIPS code; requires `state`.
    pub county: Option<String>,
}

impl GeographyFilters {
    /// Filter for a whole state.
    #[must_use]
    pub fn state(fips: impl Into<String>) -> Self {
        Self {
            state: Some(fips.into()),
            county: None,
        }
    }

    /// Filter for one county within a state.
    #[must_use]
    pub fn county(state_fips: impl Into<String>, county_fips: impl Into<String>) -> Self {
        Self {
            state: Some(state_fips.into()),
            county: Some(county_fips.into()),
        }
    }
}

/// Census Data API configuration, passed explicitly to the client.
///
/// The API works without a key for low request volumes; registered keys
/// raise the daily quota.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusConfig {
    /// Census Data API key, if registered.
    pub api_key: Option<String>,
}

/// One raw variable reading from the Census Data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRow {
    /// GEOID assembled from the response's geography columns.
    pub geoid: String,
    /// Raw variable code as requested (e.g. "`B01003_001E`").
    pub variable_code: String,
    /// Numeric value; `None` when the API reported the value missing
    /// or suppressed. Missing never silently becomes zero.
    pub value: Option<f64>,
}
