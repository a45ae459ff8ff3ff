//! Temporal alignment: multi-year collection reconciled onto one base
//! partition.
//!
//! Per-year attribute and geometry fetches run concurrently across
//! years; each year's reconciliation starts once both of its fetches
//! complete. The reconciliation itself is synchronous and pure.

use std::collections::{BTreeMap, BTreeSet};

use census_atlas_attributes_models::{Dataset, GeographyFilters};
use census_atlas_geography_models::{GeographyLevel, Partition};
use census_atlas_reconcile_models::{
    AreaWeights, ConservationWarning, ReconciledTable, VariableMap, VariableReading, WeightIssue,
};

use crate::{
    AttributeSource, DEFAULT_CONSERVATION_TOLERANCE, GeometrySource, ReconcileError, classify,
    compute_weights, conserve, redistribute,
};

/// A multi-year alignment request.
#[derive(Debug, Clone)]
pub struct AlignRequest {
    /// Geography level to align.
    pub level: GeographyLevel,
    /// Years to collect; duplicates are ignored.
    pub years: Vec<u16>,
    /// Raw variable codes per logical name (optionally per year).
    pub variables: VariableMap,
    /// Dataset to query.
    pub dataset: Dataset,
    /// Reference year whose partition everything is reconciled onto.
    /// Defaults to the most recent requested year.
    pub base_year: Option<u16>,
    /// Logical names of additive variables, eligible for area-weighted
    /// redistribution. Everything else is treated as intensive.
    pub extensive: BTreeSet<String>,
    /// State/county scoping passed to both sources.
    pub filters: GeographyFilters,
    /// Relative-error tolerance for conservation warnings.
    pub tolerance: f64,
    /// Strict mode: unknown extensive names and degenerate geometries
    /// become errors instead of logged diagnostics.
    pub strict: bool,
}

impl AlignRequest {
    /// Creates a request with default tolerance, lenient error mode, no
    /// filters, and the base year defaulted to the most recent year.
    #[must_use]
    pub const fn new(
        level: GeographyLevel,
        years: Vec<u16>,
        variables: VariableMap,
        dataset: Dataset,
    ) -> Self {
        Self {
            level,
            years,
            variables,
            dataset,
            base_year: None,
            extensive: BTreeSet::new(),
            filters: GeographyFilters {
                state: None,
                county: None,
            },
            tolerance: DEFAULT_CONSERVATION_TOLERANCE,
            strict: false,
        }
    }
}

/// Output of [`align`]: the reconciled table plus the diagnostics
/// collected along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    /// (unit, year, variable) → value on the base partition.
    pub table: ReconciledTable,
    /// Conservation violations found during redistribution.
    pub warnings: Vec<ConservationWarning>,
    /// Per-unit geometry problems found during weight computation.
    pub issues: Vec<WeightIssue>,
}

/// One year's fetched inputs.
struct YearData {
    year: u16,
    readings: Vec<VariableReading>,
    partition: Option<Partition>,
}

/// Collects all requested years and reconciles them onto the base
/// year's partition.
///
/// Stable geographies (state, region, division; county over spans
/// under 20 years) bypass geometry fetching and overlay entirely:
/// their values pass through exactly as fetched. For everything else,
/// each non-base year's partition is projected to the equal-area CRS
/// and redistributed onto the base partition, except when its GEOID
/// set matches the base exactly (boundaries carried forward), which
/// short-circuits to identity weights.
///
/// # Errors
///
/// * [`ReconcileError::InvalidRequest`] — no years, or `base_year` not
///   among them.
/// * [`ReconcileError::UnsupportedGeography`] — cross-year request for
///   a level that cannot be reconciled (ZCTA).
/// * [`ReconcileError::MissingYearData`] — a source returned nothing
///   for a year.
/// * [`ReconcileError::UnknownVariable`] — strict mode, see
///   [`classify`].
pub async fn align(
    request: &AlignRequest,
    attributes: &dyn AttributeSource,
    geometry: &dyn GeometrySource,
) -> Result<AlignedSeries, ReconcileError> {
    let years: BTreeSet<u16> = request.years.iter().copied().collect();
    let (Some(&first_year), Some(&last_year)) = (years.first(), years.last()) else {
        return Err(ReconcileError::InvalidRequest {
            message: "at least one year must be requested".to_string(),
        });
    };

    let base_year = request.base_year.unwrap_or(last_year);
    if !years.contains(&base_year) {
        return Err(ReconcileError::InvalidRequest {
            message: format!("base year {base_year} is not among the requested years"),
        });
    }

    let needs_overlay =
        years.len() > 1 && !request.level.boundaries_stable(last_year - first_year);
    if needs_overlay && !request.level.reconcilable() {
        return Err(ReconcileError::UnsupportedGeography {
            level: request.level,
        });
    }

    let classification = classify(
        &request.variables.logical_names(),
        &request.extensive,
        request.strict,
    )?;

    let fetches = years.iter().map(|&year| async move {
        let readings = fetch_year_readings(request, attributes, year);
        if needs_overlay {
            let partition = fetch_year_partition(request, geometry, year);
            let (readings, partition) = futures::future::try_join(readings, partition).await?;
            Ok(YearData {
                year,
                readings,
                partition: Some(partition),
            })
        } else {
            Ok::<_, ReconcileError>(YearData {
                year,
                readings: readings.await?,
                partition: None,
            })
        }
    });
    let fetched: Vec<YearData> = futures::future::try_join_all(fetches).await?;

    let base_projected = fetched
        .iter()
        .find(|data| data.year == base_year)
        .and_then(|data| data.partition.as_ref())
        .map(Partition::to_equal_area);

    let mut series = AlignedSeries::default();

    for data in &fetched {
        let (weights, overlaid) = if data.year == base_year || !needs_overlay {
            (passthrough_weights(&data.readings), false)
        } else {
            // needs_overlay guarantees both partitions are present.
            let (Some(partition), Some(base)) = (&data.partition, &base_projected) else {
                return Err(ReconcileError::MissingYearData {
                    year: data.year,
                    detail: "geometry was not fetched".to_string(),
                });
            };

            if partition.same_geoids(base) {
                log::info!(
                    "{} boundaries unchanged between {} and {base_year}, skipping overlay",
                    request.level,
                    data.year
                );
                (AreaWeights::identity(partition.geoids()), false)
            } else {
                log::info!(
                    "Interpolating {} values from {} boundaries onto {base_year}",
                    request.level,
                    data.year
                );
                let weights =
                    compute_weights(&partition.to_equal_area(), base, request.strict)?;
                (weights, true)
            }
        };

        let year_table = redistribute(&data.readings, &weights, &classification);
        if overlaid {
            series.warnings.extend(conserve::validate(
                &data.readings,
                &year_table,
                &classification,
                request.tolerance,
            ));
        }
        series.issues.extend(weights.issues);
        series.table.extend(year_table);
    }

    Ok(series)
}

/// Fetches one year's readings and maps raw codes back to logical names.
async fn fetch_year_readings(
    request: &AlignRequest,
    attributes: &dyn AttributeSource,
    year: u16,
) -> Result<Vec<VariableReading>, ReconcileError> {
    let codes_by_name = request.variables.codes_for_year(year).ok_or_else(|| {
        ReconcileError::MissingYearData {
            year,
            detail: "no variable codes configured for this year".to_string(),
        }
    })?;

    let codes: Vec<String> = codes_by_name.values().cloned().collect();
    let rows = attributes
        .fetch_attributes(request.level, year, request.dataset, &codes, &request.filters)
        .await?;
    if rows.is_empty() {
        return Err(ReconcileError::MissingYearData {
            year,
            detail: "attribute source returned no rows".to_string(),
        });
    }

    let logical_by_code: BTreeMap<&str, &str> = codes_by_name
        .iter()
        .map(|(logical, code)| (code.as_str(), logical.as_str()))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            logical_by_code
                .get(row.variable_code.as_str())
                .map(|logical| VariableReading {
                    geoid: row.geoid,
                    year,
                    variable: (*logical).to_string(),
                    value: row.value,
                })
        })
        .collect())
}

/// Fetches one year's partition, rejecting empty results.
async fn fetch_year_partition(
    request: &AlignRequest,
    geometry: &dyn GeometrySource,
    year: u16,
) -> Result<Partition, ReconcileError> {
    let partition = geometry
        .fetch_geometry(request.level, year, &request.filters)
        .await?;
    if partition.is_empty() {
        return Err(ReconcileError::MissingYearData {
            year,
            detail: "geometry source returned no units".to_string(),
        });
    }
    Ok(partition)
}

/// Identity weights over the units present in the readings, for years
/// whose values pass through unreconciled.
fn passthrough_weights(readings: &[VariableReading]) -> AreaWeights {
    let geoids: BTreeSet<&str> = readings.iter().map(|reading| reading.geoid.as_str()).collect();
    AreaWeights::identity(geoids)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use census_atlas_attributes_models::AttributeRow;
    use census_atlas_geography_models::{Crs, GeographicUnit};
    use geo::{MultiPolygon, polygon};

    use super::*;

    /// Serves canned rows per (year, code) and records requested codes.
    struct FixtureAttributes {
        rows: Vec<(u16, AttributeRow)>,
        requested: Mutex<Vec<(u16, Vec<String>)>>,
    }

    impl FixtureAttributes {
        fn new(rows: Vec<(u16, AttributeRow)>) -> Self {
            Self {
                rows,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AttributeSource for FixtureAttributes {
        async fn fetch_attributes(
            &self,
            _level: GeographyLevel,
            year: u16,
            _dataset: Dataset,
            variable_codes: &[String],
            _filters: &GeographyFilters,
        ) -> Result<Vec<AttributeRow>, crate::SourceError> {
            self.requested
                .lock()
                .unwrap()
                .push((year, variable_codes.to_vec()));
            Ok(self
                .rows
                .iter()
                .filter(|(row_year, row)| {
                    *row_year == year && variable_codes.contains(&row.variable_code)
                })
                .map(|(_, row)| row.clone())
                .collect())
        }
    }

    /// Serves canned partitions per year and counts fetches.
    struct FixtureGeometry {
        partitions: BTreeMap<u16, Partition>,
        fetches: Mutex<u32>,
    }

    impl FixtureGeometry {
        fn new(partitions: BTreeMap<u16, Partition>) -> Self {
            Self {
                partitions,
                fetches: Mutex::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            *self.fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl GeometrySource for FixtureGeometry {
        async fn fetch_geometry(
            &self,
            level: GeographyLevel,
            year: u16,
            _filters: &GeographyFilters,
        ) -> Result<Partition, crate::SourceError> {
            *self.fetches.lock().unwrap() += 1;
            Ok(self
                .partitions
                .get(&year)
                .cloned()
                .unwrap_or_else(|| Partition::new(level, year, Crs::EqualArea)))
        }
    }

    fn row(geoid: &str, code: &str, value: Option<f64>) -> AttributeRow {
        AttributeRow {
            geoid: geoid.to_string(),
            variable_code: code.to_string(),
            value,
        }
    }

    fn unit(geoid: &str, x0: f64, width: f64) -> GeographicUnit {
        GeographicUnit {
            geoid: geoid.to_string(),
            name: None,
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + width, y: 0.0),
                (x: x0 + width, y: 1.0),
                (x: x0, y: 1.0),
                (x: x0, y: 0.0),
            ]]),
        }
    }

    fn uniform(codes: &[(&str, &str)]) -> VariableMap {
        VariableMap::Uniform(
            codes
                .iter()
                .map(|(logical, code)| ((*logical).to_string(), (*code).to_string()))
                .collect(),
        )
    }

    fn extensive(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn empty_years_rejected() {
        let attributes = FixtureAttributes::new(Vec::new());
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let request = AlignRequest::new(
            GeographyLevel::State,
            Vec::new(),
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );

        assert!(matches!(
            align(&request, &attributes, &geometry).await,
            Err(ReconcileError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn base_year_must_be_requested() {
        let attributes = FixtureAttributes::new(Vec::new());
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let mut request = AlignRequest::new(
            GeographyLevel::State,
            vec![2018, 2020],
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );
        request.base_year = Some(2019);

        assert!(matches!(
            align(&request, &attributes, &geometry).await,
            Err(ReconcileError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn zcta_cross_year_unsupported() {
        let attributes = FixtureAttributes::new(Vec::new());
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let request = AlignRequest::new(
            GeographyLevel::Zcta,
            vec![2010, 2020],
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );

        assert!(matches!(
            align(&request, &attributes, &geometry).await,
            Err(ReconcileError::UnsupportedGeography {
                level: GeographyLevel::Zcta
            })
        ));
    }

    #[tokio::test]
    async fn missing_year_data_is_fatal() {
        // Rows only for 2015; 2020 comes back empty.
        let attributes = FixtureAttributes::new(vec![(
            2015,
            row("06", "B01003_001E", Some(100.0)),
        )]);
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let request = AlignRequest::new(
            GeographyLevel::State,
            vec![2015, 2020],
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );

        assert!(matches!(
            align(&request, &attributes, &geometry).await,
            Err(ReconcileError::MissingYearData { year: 2020, .. })
        ));
    }

    #[tokio::test]
    async fn stable_geography_bypasses_geometry_entirely() {
        let attributes = FixtureAttributes::new(vec![
            (2015, row("06", "B01003_001E", Some(38_900_000.0))),
            (2020, row("06", "B01003_001E", Some(39_500_000.0))),
        ]);
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let mut request = AlignRequest::new(
            GeographyLevel::State,
            vec![2015, 2020],
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );
        request.extensive = extensive(&["pop"]);

        let series = align(&request, &attributes, &geometry).await.unwrap();

        // Never touched the geometry source, values pass through exactly.
        assert_eq!(geometry.fetch_count(), 0);
        assert_eq!(
            series.table.get("06", 2015, "pop").unwrap().value,
            Some(38_900_000.0)
        );
        assert_eq!(
            series.table.get("06", 2020, "pop").unwrap().value,
            Some(39_500_000.0)
        );
        assert!(series.warnings.is_empty());
        assert!(series.issues.is_empty());
    }

    #[tokio::test]
    async fn per_year_codes_resolve_to_one_logical_name() {
        let attributes = FixtureAttributes::new(vec![
            (2010, row("11", "P001001", Some(601_723.0))),
            (2020, row("11", "P1_001N", Some(689_545.0))),
        ]);
        let geometry = FixtureGeometry::new(BTreeMap::new());
        let request = AlignRequest::new(
            GeographyLevel::State,
            vec![2010, 2020],
            VariableMap::PerYear(BTreeMap::from([
                (
                    2010,
                    BTreeMap::from([("pop".to_string(), "P001001".to_string())]),
                ),
                (
                    2020,
                    BTreeMap::from([("pop".to_string(), "P1_001N".to_string())]),
                ),
            ])),
            Dataset::Decennial,
        );

        let series = align(&request, &attributes, &geometry).await.unwrap();

        let requested = attributes.requested.lock().unwrap().clone();
        assert!(requested.contains(&(2010, vec!["P001001".to_string()])));
        assert!(requested.contains(&(2020, vec!["P1_001N".to_string()])));
        assert_eq!(
            series.table.get("11", 2010, "pop").unwrap().value,
            Some(601_723.0)
        );
        assert_eq!(
            series.table.get("11", 2020, "pop").unwrap().value,
            Some(689_545.0)
        );
    }

    #[tokio::test]
    async fn tract_overlay_redistributes_onto_base_partition() {
        // 2010: one tract "old" spanning [0,2]x[0,1]. 2020 (base): it
        // was split into "east" and "west". Partitions arrive already
        // planar so the fixture stays exact.
        let attributes = FixtureAttributes::new(vec![
            (2010, row("old", "B01003_001E", Some(100.0))),
            (2010, row("old", "B19013_001E", Some(52_000.0))),
            (2020, row("west", "B01003_001E", Some(60.0))),
            (2020, row("east", "B01003_001E", Some(70.0))),
            (2020, row("west", "B19013_001E", Some(55_000.0))),
            (2020, row("east", "B19013_001E", Some(58_000.0))),
        ]);
        let geometry = FixtureGeometry::new(BTreeMap::from([
            (
                2010,
                Partition::from_units(
                    GeographyLevel::Tract,
                    2010,
                    Crs::EqualArea,
                    vec![unit("old", 0.0, 2.0)],
                ),
            ),
            (
                2020,
                Partition::from_units(
                    GeographyLevel::Tract,
                    2020,
                    Crs::EqualArea,
                    vec![unit("west", 0.0, 1.0), unit("east", 1.0, 1.0)],
                ),
            ),
        ]));
        let mut request = AlignRequest::new(
            GeographyLevel::Tract,
            vec![2010, 2020],
            uniform(&[("pop", "B01003_001E"), ("median_income", "B19013_001E")]),
            Dataset::Acs5,
        );
        request.extensive = extensive(&["pop"]);

        let series = align(&request, &attributes, &geometry).await.unwrap();

        // The old tract's population splits evenly across the halves.
        assert!(
            (series.table.get("west", 2010, "pop").unwrap().value.unwrap() - 50.0).abs() < 1e-9
        );
        assert!(
            (series.table.get("east", 2010, "pop").unwrap().value.unwrap() - 50.0).abs() < 1e-9
        );
        // Intensive variable is not interpolated for the non-base year...
        assert!(series.table.get("west", 2010, "median_income").is_none());
        assert!(series.table.get("east", 2010, "median_income").is_none());
        // ...but passes through for the base year.
        assert_eq!(
            series.table.get("west", 2020, "median_income").unwrap().value,
            Some(55_000.0)
        );
        assert_eq!(
            series.table.get("east", 2020, "pop").unwrap().value,
            Some(70.0)
        );
        assert!(series.warnings.is_empty());
        assert!(series.issues.is_empty());
    }

    #[tokio::test]
    async fn unchanged_geoid_set_skips_overlay() {
        // Same GEOIDs both years; the 2010 boxes are drawn differently
        // but identity weights mean values pass through untouched.
        let attributes = FixtureAttributes::new(vec![
            (2010, row("a", "B01003_001E", Some(10.0))),
            (2010, row("b", "B01003_001E", Some(20.0))),
            (2020, row("a", "B01003_001E", Some(11.0))),
            (2020, row("b", "B01003_001E", Some(21.0))),
        ]);
        let geometry = FixtureGeometry::new(BTreeMap::from([
            (
                2010,
                Partition::from_units(
                    GeographyLevel::Tract,
                    2010,
                    Crs::EqualArea,
                    vec![unit("a", 0.0, 0.7), unit("b", 0.7, 1.3)],
                ),
            ),
            (
                2020,
                Partition::from_units(
                    GeographyLevel::Tract,
                    2020,
                    Crs::EqualArea,
                    vec![unit("a", 0.0, 1.0), unit("b", 1.0, 1.0)],
                ),
            ),
        ]));
        let mut request = AlignRequest::new(
            GeographyLevel::Tract,
            vec![2010, 2020],
            uniform(&[("pop", "B01003_001E")]),
            Dataset::Acs5,
        );
        request.extensive = extensive(&["pop"]);

        let series = align(&request, &attributes, &geometry).await.unwrap();

        assert_eq!(series.table.get("a", 2010, "pop").unwrap().value, Some(10.0));
        assert_eq!(series.table.get("b", 2010, "pop").unwrap().value, Some(20.0));
        assert!(series.warnings.is_empty());
    }
}
