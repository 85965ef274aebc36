//! Great-circle distance and radius filtering.
//!
//! [`distance_miles`] is the single source of truth for distance; adapters
//! and the classifier must call it rather than re-deriving their own.

use crate::model::{Coordinates, SiteCandidate};

/// Mean Earth radius used by the haversine formula, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance between two points, in miles.
#[must_use]
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let half_chord = (delta_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (delta_lng / 2.0).sin().powi(2);

    // clamp guards against rounding pushing the argument past 1.0
    EARTH_RADIUS_MILES * 2.0 * half_chord.sqrt().clamp(0.0, 1.0).asin()
}

/// Keep candidates within the radius, sorted ascending by distance.
#[must_use]
pub fn filter_within_radius(candidates: Vec<SiteCandidate>, radius_miles: f64) -> Vec<SiteCandidate> {
    let mut kept: Vec<SiteCandidate> = candidates
        .into_iter()
        .filter(|candidate| candidate.distance_miles <= radius_miles)
        .collect();
    kept.sort_by(|left, right| left.distance_miles.total_cmp(&right.distance_miles));
    kept
}

/// Sort candidates ascending by distance and truncate to the cap.
///
/// Adapters use this before returning so a result cap always keeps the
/// nearest matches instead of an arbitrary prefix.
#[must_use]
pub fn nearest(mut candidates: Vec<SiteCandidate>, cap: usize) -> Vec<SiteCandidate> {
    candidates.sort_by(|left, right| left.distance_miles.total_cmp(&right.distance_miles));
    candidates.truncate(cap);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    const BALTIMORE: Coordinates = Coordinates {
        latitude: 39.2904,
        longitude: -76.6122,
    };
    const WASHINGTON: Coordinates = Coordinates {
        latitude: 38.9072,
        longitude: -77.0369,
    };

    fn candidate(name: &str, distance_miles: f64) -> SiteCandidate {
        SiteCandidate {
            name: name.to_owned(),
            status: String::from("Active"),
            address: String::new(),
            contaminants: Vec::new(),
            distance_miles,
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert!(
            distance_miles(BALTIMORE, BALTIMORE).abs() < 1e-9,
            "a point must be zero miles from itself"
        );
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_miles(BALTIMORE, WASHINGTON);
        let back = distance_miles(WASHINGTON, BALTIMORE);
        assert!(
            (there - back).abs() < 1e-9,
            "distance must not depend on direction"
        );
    }

    #[test]
    fn baltimore_to_washington_is_about_35_miles() {
        let distance = distance_miles(BALTIMORE, WASHINGTON);
        assert!(
            (34.0..36.0).contains(&distance),
            "expected ~35 miles, got {distance}"
        );
    }

    #[test]
    fn filter_drops_records_beyond_radius() {
        let candidates = vec![
            candidate("far", 4.2),
            candidate("near", 0.7),
            candidate("edge", 2.0),
        ];

        let kept = filter_within_radius(candidates, 2.0);

        assert_eq!(kept.len(), 2, "4.2 miles is outside a 2 mile radius");
        assert!(
            kept.iter().all(|site| site.distance_miles <= 2.0),
            "no record may exceed the radius"
        );
    }

    #[test]
    fn filter_sorts_ascending_by_distance() {
        let candidates = vec![
            candidate("c", 1.9),
            candidate("a", 0.1),
            candidate("b", 1.0),
        ];

        let kept = filter_within_radius(candidates, 5.0);

        let distances: Vec<f64> = kept.iter().map(|site| site.distance_miles).collect();
        assert!(
            distances.windows(2).all(|pair| pair[0] <= pair[1]),
            "output must be non-decreasing in distance: {distances:?}"
        );
    }

    #[test]
    fn nearest_keeps_closest_matches_under_cap() {
        let candidates = vec![
            candidate("far", 12.0),
            candidate("near", 0.4),
            candidate("mid", 3.0),
        ];

        let capped = nearest(candidates, 2);

        assert_eq!(capped.len(), 2, "cap must truncate the list");
        assert_eq!(capped[0].name, "near");
        assert_eq!(capped[1].name, "mid");
    }
}
