//! Areal weight computation by geometric overlay.
//!
//! For every (source, target) unit pair with nonzero intersection, the
//! weight is the fraction of the source unit's area inside the target
//! unit. Candidate pairs are pre-filtered with an R-tree on target
//! bounding boxes so the quadratic overlay only runs on units that can
//! actually touch.

use census_atlas_geography_models::{Crs, GeographicUnit, Partition};
use census_atlas_reconcile_models::{AreaWeights, WeightEntry, WeightIssue};
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::ReconcileError;

/// A target unit indexed in the R-tree by its bounding box.
struct TargetEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for TargetEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Computes the sparse areal weight matrix from `source` onto `target`.
///
/// Identical partitions (same level, year, and GEOIDs) short-circuit to
/// the identity weighting without touching geometry. Otherwise both
/// partitions must already be in the equal-area planar CRS.
///
/// Zero-area source units are skipped and recorded as
/// [`WeightIssue::DegenerateGeometry`] in best-effort mode (`strict:
/// false`); strict mode turns the first one into an error. Source units
/// intersecting no target are recorded as [`WeightIssue::Unmatched`].
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidRequest`] when either partition is
/// not in the equal-area CRS, or [`ReconcileError::DegenerateGeometry`]
/// in strict mode.
pub fn compute_weights(
    source: &Partition,
    target: &Partition,
    strict: bool,
) -> Result<AreaWeights, ReconcileError> {
    if source.same_units(target) {
        return Ok(AreaWeights::identity(source.geoids()));
    }

    if source.crs != Crs::EqualArea || target.crs != Crs::EqualArea {
        return Err(ReconcileError::InvalidRequest {
            message: "both partitions must be projected to the equal-area CRS before overlay"
                .to_string(),
        });
    }

    let targets: Vec<&GeographicUnit> = target.units().collect();
    let tree = RTree::bulk_load(
        targets
            .iter()
            .enumerate()
            .map(|(index, unit)| TargetEntry {
                index,
                envelope: compute_envelope(&unit.geometry),
            })
            .collect(),
    );

    let mut weights = AreaWeights::default();

    for unit in source.units() {
        let source_area = unit.geometry.unsigned_area();
        if !source_area.is_finite() || source_area <= 0.0 {
            if strict {
                return Err(ReconcileError::DegenerateGeometry {
                    geoid: unit.geoid.clone(),
                });
            }
            log::warn!("Skipping zero-area source unit {}", unit.geoid);
            weights.issues.push(WeightIssue::DegenerateGeometry {
                geoid: unit.geoid.clone(),
            });
            continue;
        }

        let envelope = compute_envelope(&unit.geometry);

        // Sort candidates by GEOID so accumulation order is stable.
        let mut candidates: Vec<usize> = tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.index)
            .collect();
        candidates.sort_by_key(|&index| &targets[index].geoid);

        let mut matched = false;
        for index in candidates {
            let target_unit = targets[index];
            let overlap = unit
                .geometry
                .intersection(&target_unit.geometry)
                .unsigned_area();
            if overlap > 0.0 {
                matched = true;
                weights.entries.push(WeightEntry {
                    source_geoid: unit.geoid.clone(),
                    target_geoid: target_unit.geoid.clone(),
                    weight: overlap / source_area,
                });
            }
        }

        if !matched {
            log::warn!(
                "Source unit {} intersects no target unit; its readings cannot be redistributed",
                unit.geoid
            );
            weights.issues.push(WeightIssue::Unmatched {
                geoid: unit.geoid.clone(),
            });
        }
    }

    Ok(weights)
}

/// Bounding box envelope for a `MultiPolygon`.
fn compute_envelope(geometry: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    geometry.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use census_atlas_geography_models::GeographyLevel;
    use geo::polygon;

    use super::*;

    fn unit(geoid: &str, x0: f64, y0: f64, width: f64, height: f64) -> GeographicUnit {
        GeographicUnit {
            geoid: geoid.to_string(),
            name: None,
            geometry: MultiPolygon(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + width, y: y0),
                (x: x0 + width, y: y0 + height),
                (x: x0, y: y0 + height),
                (x: x0, y: y0),
            ]]),
        }
    }

    fn partition(year: u16, units: Vec<GeographicUnit>) -> Partition {
        Partition::from_units(GeographyLevel::Tract, year, Crs::EqualArea, units)
    }

    fn entry<'a>(weights: &'a AreaWeights, source: &str, target: &str) -> &'a WeightEntry {
        weights
            .entries
            .iter()
            .find(|e| e.source_geoid == source && e.target_geoid == target)
            .unwrap()
    }

    #[test]
    fn identical_partitions_short_circuit_to_identity() {
        let p = partition(2020, vec![unit("001", 0.0, 0.0, 1.0, 1.0)]);
        let weights = compute_weights(&p, &p.clone(), true).unwrap();
        assert!(weights.is_identity());
        assert!(weights.issues.is_empty());
    }

    #[test]
    fn rejects_unprojected_partitions() {
        let geographic = Partition::from_units(
            GeographyLevel::Tract,
            2010,
            Crs::Geographic,
            vec![unit("001", 0.0, 0.0, 1.0, 1.0)],
        );
        let projected = partition(2020, vec![unit("100", 0.0, 0.0, 1.0, 1.0)]);

        assert!(matches!(
            compute_weights(&geographic, &projected, false),
            Err(ReconcileError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn split_unit_weights_by_area_share() {
        // One 2x1 source unit; two 1x1 target units covering each half.
        let source = partition(2010, vec![unit("old", 0.0, 0.0, 2.0, 1.0)]);
        let target = partition(
            2020,
            vec![
                unit("west", 0.0, 0.0, 1.0, 1.0),
                unit("east", 1.0, 0.0, 1.0, 1.0),
            ],
        );

        let weights = compute_weights(&source, &target, true).unwrap();
        assert_eq!(weights.entries.len(), 2);
        assert!((entry(&weights, "old", "west").weight - 0.5).abs() < 1e-9);
        assert!((entry(&weights, "old", "east").weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn uneven_split() {
        // Source covers [0,4]x[0,1]; targets cover 1/4 and 3/4 of it.
        let source = partition(2010, vec![unit("old", 0.0, 0.0, 4.0, 1.0)]);
        let target = partition(
            2020,
            vec![
                unit("small", 0.0, 0.0, 1.0, 1.0),
                unit("large", 1.0, 0.0, 3.0, 1.0),
            ],
        );

        let weights = compute_weights(&source, &target, true).unwrap();
        assert!((entry(&weights, "old", "small").weight - 0.25).abs() < 1e-9);
        assert!((entry(&weights, "old", "large").weight - 0.75).abs() < 1e-9);
    }

    #[test]
    fn weight_sums_reach_one_for_gap_free_cover() {
        // Two source units, three overlapping target strips.
        let source = partition(
            2010,
            vec![
                unit("a", 0.0, 0.0, 3.0, 2.0),
                unit("b", 3.0, 0.0, 3.0, 2.0),
            ],
        );
        let target = partition(
            2020,
            vec![
                unit("x", 0.0, 0.0, 2.0, 2.0),
                unit("y", 2.0, 0.0, 2.0, 2.0),
                unit("z", 4.0, 0.0, 2.0, 2.0),
            ],
        );

        let weights = compute_weights(&source, &target, true).unwrap();
        for (geoid, sum) in weights.source_weight_sums() {
            assert!((sum - 1.0).abs() < 1e-6, "weights for {geoid} sum to {sum}");
        }
    }

    #[test]
    fn degenerate_source_collected_in_best_effort() {
        let source = partition(
            2010,
            vec![
                unit("flat", 0.0, 0.0, 1.0, 0.0),
                unit("ok", 0.0, 0.0, 1.0, 1.0),
            ],
        );
        let target = partition(2020, vec![unit("t", 0.0, 0.0, 1.0, 1.0)]);

        let weights = compute_weights(&source, &target, false).unwrap();
        assert_eq!(weights.issues, vec![WeightIssue::DegenerateGeometry {
            geoid: "flat".to_string()
        }]);
        assert_eq!(weights.entries.len(), 1);
        assert_eq!(weights.entries[0].source_geoid, "ok");
    }

    #[test]
    fn degenerate_source_errors_in_strict() {
        let source = partition(2010, vec![unit("flat", 0.0, 0.0, 1.0, 0.0)]);
        let target = partition(2020, vec![unit("t", 0.0, 0.0, 1.0, 1.0)]);

        assert!(matches!(
            compute_weights(&source, &target, true),
            Err(ReconcileError::DegenerateGeometry { geoid }) if geoid == "flat"
        ));
    }

    #[test]
    fn disjoint_source_flagged_unmatched() {
        let source = partition(2010, vec![unit("island", 100.0, 100.0, 1.0, 1.0)]);
        let target = partition(2020, vec![unit("t", 0.0, 0.0, 1.0, 1.0)]);

        let weights = compute_weights(&source, &target, true).unwrap();
        assert!(weights.entries.is_empty());
        assert_eq!(weights.issues, vec![WeightIssue::Unmatched {
            geoid: "island".to_string()
        }]);
    }
}
