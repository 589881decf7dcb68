use std::collections::HashSet;

use crate::classifier::LeadClassifier;
use crate::data_models::{GeoPoint, Lead, RawPlaceResult};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Slack on top of the requested radius to absorb provider imprecision.
pub const RADIUS_TOLERANCE: f64 = 1.1;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    // Rounding can push `h` past 1.0 for near-antipodal points.
    let h = ((d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn max_distance_km(radius_km: f64) -> f64 {
    radius_km * RADIUS_TOLERANCE
}

/// Merges the per-point result sets of one sweep into a distance-ordered,
/// duplicate-free lead list.
///
/// * The first record seen for a (title, address) pair wins, whether or not it
///   survives the distance filter.
/// * Records without coordinates are placed at `center`.
/// * Leads farther than `radius_km * 1.1` (after rounding) are dropped.
/// * Ordering is ascending by distance; equal distances keep input order.
///
/// Returned leads are unclassified (`cold`); see [`LeadClassifier`].
pub fn aggregate(raw: Vec<RawPlaceResult>, center: GeoPoint, radius_km: f64) -> Vec<Lead> {
    let limit = max_distance_km(radius_km);
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(raw.len());
    let mut leads = Vec::new();

    for place in raw {
        let (title, address) = place.dedup_key();
        if !seen.insert((title.to_string(), address.to_string())) {
            continue;
        }

        let distance_km = round_to_tenth(haversine_km(center, place.position_or(center)));
        if distance_km.is_nan() || distance_km > limit {
            continue;
        }

        leads.push(Lead::new(place, distance_km));
    }

    // Vec::sort_by is stable, which keeps first-seen order on ties.
    leads.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    leads
}

/// [`aggregate`] followed by classification.
pub fn aggregate_and_classify(
    raw: Vec<RawPlaceResult>,
    center: GeoPoint,
    radius_km: f64,
    classifier: &LeadClassifier,
) -> Vec<Lead> {
    classifier.classify_all(aggregate(raw, center, radius_km))
}
