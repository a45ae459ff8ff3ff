//! Albers equal-area conic projection.
//!
//! Area-weighted overlay needs both partitions in one equal-area planar
//! CRS. A single fixed forward transform with CONUS parameters (standard
//! parallels 29.5°N and 45.5°N, origin 23°N 96°W, spherical) is enough
//! for weight computation: weights are area *ratios*, so any equal-area
//! projection yields the same result.

use geo::{Coord, MapCoords, MultiPolygon};

/// Authalic sphere radius in meters (the sphere with Earth's surface area).
const EARTH_RADIUS_M: f64 = 6_371_007.2;

/// First standard parallel, degrees north.
const STD_PARALLEL_1_DEG: f64 = 29.5;
/// Second standard parallel, degrees north.
const STD_PARALLEL_2_DEG: f64 = 45.5;
/// Latitude of origin, degrees north.
const ORIGIN_LAT_DEG: f64 = 23.0;
/// Central meridian, degrees east.
const ORIGIN_LON_DEG: f64 = -96.0;

/// Projects lon/lat degree coordinates to planar equal-area meters.
///
/// Spherical Albers forward equations (Snyder, Map Projections: A
/// Working Manual, eq. 14-1..14-4).
#[must_use]
pub fn albers_forward(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let phi_1 = STD_PARALLEL_1_DEG.to_radians();
    let phi_2 = STD_PARALLEL_2_DEG.to_radians();
    let phi_0 = ORIGIN_LAT_DEG.to_radians();
    let lam_0 = ORIGIN_LON_DEG.to_radians();

    let n = (phi_1.sin() + phi_2.sin()) / 2.0;
    let c = phi_1.cos().mul_add(phi_1.cos(), 2.0 * n * phi_1.sin());

    let phi = lat_deg.to_radians();
    let lam = lon_deg.to_radians();

    let rho = EARTH_RADIUS_M / n * (c - 2.0 * n * phi.sin()).sqrt();
    let rho_0 = EARTH_RADIUS_M / n * (c - 2.0 * n * phi_0.sin()).sqrt();
    let theta = n * (lam - lam_0);

    (rho * theta.sin(), rho_0 - rho * theta.cos())
}

/// Projects a lon/lat `MultiPolygon` into the equal-area plane.
#[must_use]
pub fn albers_equal_area(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(|Coord { x, y }| {
        let (px, py) = albers_forward(x, y);
        Coord { x: px, y: py }
    })
}

#[cfg(test)]
mod tests {
    use geo::{Area, polygon};

    use super::*;

    /// True spherical area of a lon/lat cell, in square meters.
    fn cell_area(lon_span_deg: f64, lat_bottom_deg: f64, lat_top_deg: f64) -> f64 {
        EARTH_RADIUS_M
            * EARTH_RADIUS_M
            * lon_span_deg.to_radians()
            * (lat_top_deg.to_radians().sin() - lat_bottom_deg.to_radians().sin())
    }

    #[test]
    fn preserves_cell_area() {
        // One-degree cell in the middle of CONUS.
        let cell = MultiPolygon(vec![polygon![
            (x: -96.0, y: 38.0),
            (x: -95.0, y: 38.0),
            (x: -95.0, y: 39.0),
            (x: -96.0, y: 39.0),
            (x: -96.0, y: 38.0),
        ]]);

        let projected = albers_equal_area(&cell);
        let expected = cell_area(1.0, 38.0, 39.0);
        let actual = projected.unsigned_area();

        let relative_error = (actual - expected).abs() / expected;
        assert!(
            relative_error < 0.01,
            "area off by {relative_error}: {actual} vs {expected}"
        );
    }

    #[test]
    fn area_ratio_stable_across_latitudes() {
        // Two equal lon/lat cells at different latitudes have different
        // true areas; the projection must reproduce their ratio.
        let south = MultiPolygon(vec![polygon![
            (x: -90.0, y: 30.0),
            (x: -89.0, y: 30.0),
            (x: -89.0, y: 31.0),
            (x: -90.0, y: 31.0),
            (x: -90.0, y: 30.0),
        ]]);
        let north = MultiPolygon(vec![polygon![
            (x: -90.0, y: 44.0),
            (x: -89.0, y: 44.0),
            (x: -89.0, y: 45.0),
            (x: -90.0, y: 45.0),
            (x: -90.0, y: 44.0),
        ]]);

        let ratio = albers_equal_area(&south).unsigned_area()
            / albers_equal_area(&north).unsigned_area();
        let expected = cell_area(1.0, 30.0, 31.0) / cell_area(1.0, 44.0, 45.0);

        assert!((ratio - expected).abs() / expected < 0.01);
    }

    #[test]
    fn origin_maps_near_axis() {
        // Points on the central meridian have x == 0.
        let (x, _) = albers_forward(ORIGIN_LON_DEG, 40.0);
        assert!(x.abs() < 1e-6);
    }
}
