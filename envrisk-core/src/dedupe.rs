//! First-occurrence-wins collapsing of near-duplicate facility records.

use crate::model::NormalizedSite;

/// Two records closer together than this refer to the same facility.
const SAME_FACILITY_DELTA_MILES: f64 = 0.1;

/// Drop records that duplicate an earlier one in the sequence.
///
/// Two records are the same physical facility when their names are equal
/// (case-sensitive, exact) and their distances differ by less than 0.1
/// miles. Spelling variants are intentionally not merged: discarding a
/// distinct facility is worse than listing one twice.
///
/// Written as a fold over the ordered input so the outcome depends only on
/// record order, never on execution order.
#[must_use]
pub fn dedupe_sites(sites: Vec<NormalizedSite>) -> Vec<NormalizedSite> {
    sites.into_iter().fold(Vec::new(), |mut kept, site| {
        let already_present = kept.iter().any(|earlier: &NormalizedSite| {
            earlier.name == site.name
                && (earlier.distance_miles - site.distance_miles).abs() < SAME_FACILITY_DELTA_MILES
        });
        if !already_present {
            kept.push(site);
        }
        kept
    })
}
