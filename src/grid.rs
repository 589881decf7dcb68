//! Sample-point planning for a radar sweep.
//!
//! A small search area is covered by a single query at the center. Anything
//! from 1 km up gets the center plus four diagonal neighbours so that the
//! provider's per-query result cap bites less in dense areas.

use crate::data_models::{GeoPoint, GridPoint};

/// Approximate degrees of latitude per kilometre.
pub const DEGREES_PER_KM: f64 = 0.009;

const MIN_COS_LAT: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default)]
pub struct GridPlanner {
    /// Widen the longitude offset by `1 / cos(lat)` so the diagonal points sit
    /// the same physical distance east/west as north/south.
    correct_longitude: bool,
}

impl GridPlanner {
    pub fn new(correct_longitude: bool) -> Self {
        Self { correct_longitude }
    }

    /// Points are returned in a fixed order: center, NE, SW, NW, SE. The index
    /// of each point feeds the provider's zoom hint.
    pub fn plan(&self, center: GeoPoint, radius_km: f64) -> Vec<GridPoint> {
        if radius_km < 1.0 {
            return vec![center];
        }

        let lat_offset = radius_km * DEGREES_PER_KM;
        let lng_offset = if self.correct_longitude {
            lat_offset / center.lat.to_radians().cos().max(MIN_COS_LAT)
        } else {
            lat_offset
        };

        vec![
            center,
            GeoPoint::new(center.lat + lat_offset, center.lng + lng_offset),
            GeoPoint::new(center.lat - lat_offset, center.lng - lng_offset),
            GeoPoint::new(center.lat + lat_offset, center.lng - lng_offset),
            GeoPoint::new(center.lat - lat_offset, center.lng + lng_offset),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOGOTA: GeoPoint = GeoPoint {
        lat: 4.7110,
        lng: -74.0721,
    };

    #[test]
    fn small_radius_is_single_center_point() {
        let planner = GridPlanner::default();
        for radius in [0.0, 0.1, 0.5, 0.999] {
            assert_eq!(planner.plan(BOGOTA, radius), vec![BOGOTA]);
        }
    }

    #[test]
    fn large_radius_is_center_plus_symmetric_diagonals() {
        let planner = GridPlanner::default();
        let points = planner.plan(BOGOTA, 5.0);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], BOGOTA);

        let offset = 5.0 * DEGREES_PER_KM;
        let ne = points[1];
        assert!((ne.lat - (BOGOTA.lat + offset)).abs() < 1e-12);
        assert!((ne.lng - (BOGOTA.lng + offset)).abs() < 1e-12);

        // Every corner has its mirror image through the center.
        for p in &points[1..] {
            let mirrored = GeoPoint::new(2.0 * BOGOTA.lat - p.lat, 2.0 * BOGOTA.lng - p.lng);
            assert!(
                points[1..]
                    .iter()
                    .any(|q| (q.lat - mirrored.lat).abs() < 1e-9
                        && (q.lng - mirrored.lng).abs() < 1e-9),
                "no mirror for {p:?}"
            );
        }
    }

    #[test]
    fn radius_of_exactly_one_km_uses_full_grid() {
        assert_eq!(GridPlanner::default().plan(BOGOTA, 1.0).len(), 5);
    }

    #[test]
    fn plan_is_deterministic() {
        let planner = GridPlanner::new(true);
        assert_eq!(planner.plan(BOGOTA, 3.0), planner.plan(BOGOTA, 3.0));
    }

    #[test]
    fn longitude_correction_widens_offset_at_high_latitude() {
        let oslo = GeoPoint::new(59.91, 10.75);
        let coarse = GridPlanner::new(false).plan(oslo, 10.0);
        let corrected = GridPlanner::new(true).plan(oslo, 10.0);

        assert_eq!(coarse[1].lat, corrected[1].lat);
        let coarse_dlng = coarse[1].lng - oslo.lng;
        let corrected_dlng = corrected[1].lng - oslo.lng;
        // cos(59.91°) ≈ 0.5
        assert!((corrected_dlng / coarse_dlng - 2.0).abs() < 0.01);
    }

    #[test]
    fn longitude_correction_stays_finite_at_pole() {
        let pole = GeoPoint::new(90.0, 0.0);
        let points = GridPlanner::new(true).plan(pole, 2.0);
        assert!(points.iter().all(|p| p.lng.is_finite()));
    }
}
