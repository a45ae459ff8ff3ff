//! Census Data API request building and response decoding.
//!
//! The API returns a JSON array of arrays: a header row of column names
//! followed by data rows of strings (or nulls). Requested variable
//! columns are decoded to numbers; the geography component columns are
//! concatenated in hierarchical order to form the GEOID.

use std::fmt::Write as _;

use async_trait::async_trait;
use census_atlas_attributes_models::{AttributeRow, CensusConfig, Dataset, GeographyFilters};
use census_atlas_geography_models::GeographyLevel;
use census_atlas_reconcile::{AttributeSource, SourceError};

use crate::ApiError;

/// Base URL of the Census Data API.
pub const CENSUS_API_BASE_URL: &str = "https://api.census.gov/data";

/// ACS sentinel codes meaning the value is missing or suppressed.
/// Decoded to missing, never to the literal number.
const MISSING_VALUE_CODES: &[f64] = &[
    -111_111_111.0,
    -222_222_222.0,
    -333_333_333.0,
    -444_444_444.0,
    -555_555_555.0,
    -666_666_666.0,
    -777_777_777.0,
];

/// Geography component columns in hierarchical order. Whatever subset
/// appears in a response is concatenated in this order to form the
/// GEOID (e.g. state + county + tract = "11001000100").
const GEO_COLUMN_ORDER: &[&str] = &[
    "region",
    "division",
    "state",
    "county",
    "tract",
    "block group",
    "block",
    "place",
    "zip code tabulation area",
];

/// Async client for the Census Data API.
pub struct CensusApiClient {
    client: reqwest::Client,
    base_url: String,
    config: CensusConfig,
}

impl CensusApiClient {
    /// Builds a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(config: CensusConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: CENSUS_API_BASE_URL.to_string(),
            config,
        })
    }

    /// Overrides the API base URL (used against test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches readings for the given raw variable codes.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails or the response is not
    /// in the documented array-of-arrays shape.
    pub async fn fetch(
        &self,
        level: GeographyLevel,
        year: u16,
        dataset: Dataset,
        variable_codes: &[String],
        filters: &GeographyFilters,
    ) -> Result<Vec<AttributeRow>, ApiError> {
        let url = build_url(
            &self.base_url,
            level,
            year,
            dataset,
            variable_codes,
            filters,
            self.config.api_key.as_deref(),
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(ApiError::Response {
                message: format!(
                    "HTTP {status} from Census API for {level} {year}: {}",
                    truncate_for_log(&body, 200)
                ),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        let rows = parse_response(&json, variable_codes)?;
        log::info!("Fetched {} readings for {level} {year} ({dataset})", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl AttributeSource for CensusApiClient {
    async fn fetch_attributes(
        &self,
        level: GeographyLevel,
        year: u16,
        dataset: Dataset,
        variable_codes: &[String],
        filters: &GeographyFilters,
    ) -> Result<Vec<AttributeRow>, SourceError> {
        self.fetch(level, year, dataset, variable_codes, filters)
            .await
            .map_err(Into::into)
    }
}

/// Builds the request URL for one (level, year, dataset) query.
fn build_url(
    base_url: &str,
    level: GeographyLevel,
    year: u16,
    dataset: Dataset,
    variable_codes: &[String],
    filters: &GeographyFilters,
    api_key: Option<&str>,
) -> String {
    let mut url = format!(
        "{base_url}/{year}/{path}?get=NAME,{codes}",
        path = dataset.api_path(year),
        codes = variable_codes.join(","),
    );

    match level {
        GeographyLevel::State => {
            let target = filters.state.as_deref().unwrap_or("*");
            write!(url, "&for=state:{target}").unwrap();
        }
        GeographyLevel::County => {
            let target = filters.county.as_deref().unwrap_or("*");
            write!(url, "&for=county:{target}").unwrap();
            if let Some(state) = &filters.state {
                write!(url, "&in=state:{state}").unwrap();
            }
        }
        _ => {
            let name = level.api_name().replace(' ', "%20");
            write!(url, "&for={name}:*").unwrap();
            if let Some(state) = &filters.state {
                write!(url, "&in=state:{state}").unwrap();
            }
            if let Some(county) = &filters.county {
                write!(url, "&in=county:{county}").unwrap();
            }
        }
    }

    if let Some(key) = api_key {
        write!(url, "&key={key}").unwrap();
    }

    url
}

/// Parses the array-of-arrays response body into readings.
fn parse_response(
    body: &serde_json::Value,
    variable_codes: &[String],
) -> Result<Vec<AttributeRow>, ApiError> {
    let rows = body.as_array().ok_or_else(|| ApiError::Response {
        message: "expected a JSON array of arrays".to_string(),
    })?;

    let Some((header, data_rows)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let header: Vec<&str> = header
        .as_array()
        .ok_or_else(|| ApiError::Response {
            message: "expected an array header row".to_string(),
        })?
        .iter()
        .map(|cell| cell.as_str().unwrap_or_default())
        .collect();

    // Geography columns present in this response, hierarchical order.
    let geo_columns: Vec<usize> = GEO_COLUMN_ORDER
        .iter()
        .filter_map(|name| header.iter().position(|column| column == name))
        .collect();
    if geo_columns.is_empty() {
        return Err(ApiError::Response {
            message: "no geography columns in response header".to_string(),
        });
    }

    let code_columns: Vec<(&str, usize)> = variable_codes
        .iter()
        .filter_map(|code| {
            header
                .iter()
                .position(|column| column == code)
                .map(|index| (code.as_str(), index))
        })
        .collect();

    let mut readings = Vec::new();
    for row in data_rows {
        let Some(cells) = row.as_array() else {
            continue;
        };

        let mut geoid = String::new();
        for &index in &geo_columns {
            if let Some(component) = cells.get(index).and_then(serde_json::Value::as_str) {
                geoid.push_str(component);
            }
        }
        if geoid.is_empty() {
            continue;
        }

        for &(code, index) in &code_columns {
            readings.push(AttributeRow {
                geoid: geoid.clone(),
                variable_code: code.to_string(),
                value: cells.get(index).and_then(decode_value),
            });
        }
    }

    Ok(readings)
}

/// Decodes one response cell to a numeric value.
///
/// Nulls, non-numeric strings, and the ACS sentinel missing codes all
/// decode to `None`.
fn decode_value(cell: &serde_json::Value) -> Option<f64> {
    let value = match cell {
        serde_json::Value::Number(number) => number.as_f64()?,
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if MISSING_VALUE_CODES.contains(&value) {
        return None;
    }
    Some(value)
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}
