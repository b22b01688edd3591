use std::collections::HashSet;

use super::models::Poi;

const EARTH_RADIUS_KM: f64 = 6371.0;
const DISTANCE_BUDGET_KM: f64 = 10.0;
const CATEGORY_BONUS: f64 = 0.5;

/// Great-circle distance in km.
pub fn haversine_km(a: &Poi, b: &Poi) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

pub fn walking_km(items: &[Poi]) -> f64 {
    items
        .windows(2)
        .map(|pair| haversine_km(&pair[0], &pair[1]))
        .sum()
}

/// `max(0, 10 - walk_km) + 0.5 * distinct_categories`, two decimals.
///
/// Stops are scored in the order given. The category bonus has no ceiling.
pub fn score_day(items: &[Poi]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let categories: HashSet<String> = items.iter().map(Poi::category_key).collect();
    let score = (DISTANCE_BUDGET_KM - walking_km(items)).max(0.0)
        + CATEGORY_BONUS * categories.len() as f64;
    (score * 100.0).round() / 100.0
}
