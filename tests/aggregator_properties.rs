use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use radar::aggregator::{aggregate, max_distance_km};
use radar::classifier::LeadClassifier;
use radar::data_models::{GeoPoint, LeadStatus, RawPlaceResult};
use radar::grid::GridPlanner;

const NAMES: &[&str] = &["Pan", "Café", "Tienda", "Droguería", "Ferretería", "Papelería"];

fn random_place(rng: &mut StdRng, center: GeoPoint, spread_deg: f64) -> RawPlaceResult {
    let located = rng.random_bool(0.9);
    RawPlaceResult {
        // Small name/address pools so duplicates show up often.
        title: NAMES[rng.random_range(0..NAMES.len())].to_string(),
        address: format!("Calle {}", rng.random_range(0..8)),
        latitude: located.then(|| center.lat + rng.random_range(-spread_deg..spread_deg)),
        longitude: located.then(|| center.lng + rng.random_range(-spread_deg..spread_deg)),
        website: rng
            .random_bool(0.5)
            .then(|| "https://example.com".to_string()),
        ..Default::default()
    }
}

#[test]
fn aggregate_invariants_hold_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let center = GeoPoint::new(rng.random_range(-60.0..60.0), rng.random_range(-179.0..179.0));
        let radius_km = rng.random_range(0.2..25.0);
        let spread = radius_km * 0.02;
        let raw: Vec<_> = (0..rng.random_range(0..60))
            .map(|_| random_place(&mut rng, center, spread))
            .collect();

        let leads = LeadClassifier.classify_all(aggregate(raw, center, radius_km));

        let limit = max_distance_km(radius_km);
        let mut keys = HashSet::new();
        for lead in &leads {
            assert!(lead.distance_km <= limit, "{} > {limit}", lead.distance_km);
            assert!(
                keys.insert((lead.place.title.clone(), lead.place.address.clone())),
                "duplicate key {:?}",
                (&lead.place.title, &lead.place.address)
            );
            let expected = if lead.place.website.is_some() {
                LeadStatus::Qualified
            } else {
                LeadStatus::Cold
            };
            assert_eq!(lead.status, expected);
        }
        for pair in leads.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }
}

#[test]
fn grid_shape_holds_for_random_inputs() {
    let mut rng = StdRng::seed_from_u64(42);
    let planner = GridPlanner::default();

    for _ in 0..200 {
        let center = GeoPoint::new(rng.random_range(-80.0..80.0), rng.random_range(-170.0..170.0));
        let radius_km = rng.random_range(0.0..30.0);
        let points = planner.plan(center, radius_km);

        if radius_km < 1.0 {
            assert_eq!(points, vec![center]);
            continue;
        }

        assert_eq!(points.len(), 5);
        assert_eq!(points[0], center);
        let (sum_lat, sum_lng) = points[1..]
            .iter()
            .fold((0.0, 0.0), |(a, b), p| (a + p.lat - center.lat, b + p.lng - center.lng));
        assert!(sum_lat.abs() < 1e-9 && sum_lng.abs() < 1e-9);
    }
}
