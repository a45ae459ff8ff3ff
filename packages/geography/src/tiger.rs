//! Boundary fetching from the Census Bureau `TIGERweb` REST API.
//!
//! `TIGERweb` serves each boundary vintage as an `ArcGIS` map service;
//! features are queried as `GeoJSON` with paginated requests
//! (`resultOffset` + `resultRecordCount`).

use census_atlas_attributes_models::GeographyFilters;
use census_atlas_geography_models::{Crs, GeographicUnit, GeographyLevel, Partition};
use census_atlas_reconcile::{GeometrySource, SourceError};
use geo::MultiPolygon;

use crate::GeoError;

/// Base URL of the `TIGERweb` `ArcGIS` REST services.
pub const TIGERWEB_BASE_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb";

/// Page size for `TIGERweb` paginated requests. Kept low to avoid WAF
/// blocks on large geospatial responses.
const TIGERWEB_PAGE_SIZE: u32 = 100;

/// Browser-like User-Agent to avoid WAF blocks on `TIGERweb`.
const TIGERWEB_USER_AGENT: &str = "Mozilla/5.0 (compatible; CensusAtlas/1.0; +https://github.com)";

/// Async client for `TIGERweb` boundary queries.
pub struct TigerClient {
    client: reqwest::Client,
    base_url: String,
}

impl TigerClient {
    /// Builds a client configured for `TIGERweb` requests.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the underlying HTTP client cannot be
    /// built.
    pub fn new() -> Result<Self, GeoError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(TIGERWEB_USER_AGENT)
                .build()?,
            base_url: TIGERWEB_BASE_URL.to_string(),
        })
    }

    /// Overrides the service base URL (used against test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetches the boundary partition for one (level, year) request.
    ///
    /// Geometries come back in lon/lat degrees, so the partition is
    /// tagged [`Crs::Geographic`]; projection happens in the engine.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if a page request fails or the response is
    /// not valid `GeoJSON`.
    pub async fn fetch(
        &self,
        level: GeographyLevel,
        year: u16,
        filters: &GeographyFilters,
    ) -> Result<Partition, GeoError> {
        let url = build_query_url(&self.base_url, level, year, filters);
        let label = format!("{level} boundaries for {year}");
        log::info!("Fetching {label}...");

        let features = self.fetch_paginated(&url, &label).await?;

        let mut partition = Partition::new(level, year, Crs::Geographic);
        for feature in &features {
            match parse_feature(feature) {
                Some(unit) => partition.insert(unit),
                None => log::warn!("Skipping TIGERweb feature with missing GEOID or geometry"),
            }
        }

        log::info!("Loaded {} units for {label}", partition.len());
        Ok(partition)
    }

    /// Fetches all features from a `TIGERweb` endpoint using paginated
    /// requests, following the `exceededTransferLimit` marker.
    async fn fetch_paginated(
        &self,
        base_url: &str,
        label: &str,
    ) -> Result<Vec<serde_json::Value>, GeoError> {
        let mut all_features: Vec<serde_json::Value> = Vec::new();
        let mut offset = 0u32;

        loop {
            let url = format!(
                "{base_url}&resultRecordCount={TIGERWEB_PAGE_SIZE}&resultOffset={offset}"
            );

            let resp = self.client.get(&url).send().await?;
            let status = resp.status();
            let body = resp.text().await?;

            if !status.is_success() {
                return Err(GeoError::Conversion {
                    message: format!(
                        "TIGERweb request for {label} (offset={offset}) failed with HTTP \
                         {status}: {}",
                        truncate_for_log(&body, 500)
                    ),
                });
            }

            let json: serde_json::Value = serde_json::from_str(&body)?;

            // ArcGIS reports failures inside a 200 response:
            // {"error": {"code": 500, "message": "..."}}
            if let Some(error_obj) = json.get("error") {
                return Err(GeoError::Conversion {
                    message: format!("ArcGIS error for {label} (offset={offset}): {error_obj}"),
                });
            }

            let features = json["features"]
                .as_array()
                .ok_or_else(|| GeoError::Conversion {
                    message: format!(
                        "No features array in TIGERweb response for {label} (offset={offset})"
                    ),
                })?;

            if features.is_empty() {
                break;
            }

            #[allow(clippy::cast_possible_truncation)]
            let page_len = features.len() as u32;

            all_features.extend(features.iter().cloned());

            // ArcGIS sets exceededTransferLimit=true when more pages exist
            let exceeded = json
                .get("exceededTransferLimit")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);

            if !exceeded {
                break;
            }

            offset += page_len;
            log::info!(
                "{label}: fetched {page_len} features (total so far: {}), fetching next page...",
                all_features.len()
            );
        }

        Ok(all_features)
    }
}

#[async_trait::async_trait]
impl GeometrySource for TigerClient {
    async fn fetch_geometry(
        &self,
        level: GeographyLevel,
        year: u16,
        filters: &GeographyFilters,
    ) -> Result<Partition, SourceError> {
        self.fetch(level, year, filters).await.map_err(Into::into)
    }
}

/// `TIGERweb` map service carrying the boundary vintage for a year.
///
/// The decennial snapshots carry their census-day boundaries; other
/// years use the matching ACS vintage service (available 2012-2023).
fn service_for_year(year: u16) -> String {
    match year {
        2010 => "tigerWMS_Census2010".to_string(),
        2020 => "tigerWMS_Census2020".to_string(),
        2012..=2023 => format!("tigerWMS_ACS{year}"),
        year if year > 2023 => "tigerWMS_ACS2023".to_string(),
        _ => "tigerWMS_Census2010".to_string(),
    }
}

/// Layer number for a geography level within a `TIGERweb` vintage
/// service (the vintage services share one layer numbering).
const fn layer_for_level(level: GeographyLevel) -> u32 {
    match level {
        GeographyLevel::Region => 88,
        GeographyLevel::Division => 86,
        GeographyLevel::State => 84,
        GeographyLevel::County => 82,
        GeographyLevel::Place => 28,
        GeographyLevel::Block => 12,
        GeographyLevel::BlockGroup => 9,
        GeographyLevel::Tract => 8,
        GeographyLevel::Zcta => 2,
    }
}

/// Builds the `ArcGIS` query URL for one (level, year) request, without
/// pagination parameters.
fn build_query_url(
    base_url: &str,
    level: GeographyLevel,
    year: u16,
    filters: &GeographyFilters,
) -> String {
    let where_clause = match (&filters.state, &filters.county) {
        (Some(state), Some(county)) => {
            format!("STATE%3D%27{state}%27%20AND%20COUNTY%3D%27{county}%27")
        }
        (Some(state), None) => format!("STATE%3D%27{state}%27"),
        _ => "1%3D1".to_string(),
    };

    format!(
        "{base_url}/{service}/MapServer/{layer}/query\
         ?where={where_clause}\
         &outFields=GEOID,NAME,BASENAME\
         &outSR=4326\
         &f=geojson\
         &returnGeometry=true",
        service = service_for_year(year),
        layer = layer_for_level(level),
    )
}

/// Parses one `GeoJSON` feature into a [`GeographicUnit`].
///
/// Handles both `Polygon` and `MultiPolygon` geometry types; anything
/// else (or a missing GEOID) is skipped.
fn parse_feature(feature: &serde_json::Value) -> Option<GeographicUnit> {
    let props = &feature["properties"];
    let geoid = props["GEOID"].as_str()?;
    if geoid.is_empty() {
        return None;
    }

    let name = props["NAME"]
        .as_str()
        .or_else(|| props["BASENAME"].as_str())
        .map(ToString::to_string);

    let geometry: geojson::Geometry =
        serde_json::from_value(feature.get("geometry")?.clone()).ok()?;
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    let geometry = match geometry {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => return None,
    };

    Some(GeographicUnit {
        geoid: geoid.to_string(),
        name,
        geometry,
    })
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}
