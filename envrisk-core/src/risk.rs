//! Risk tier classification.
//!
//! Tiers are a pure function of distance and category-specific severity
//! inputs. Threshold values are per-source configuration carried in each
//! source's [`crate::plugin::GeoProfile`], not a global table.

use serde::{Deserialize, Serialize};

use crate::model::RiskLevel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
/// Distance thresholds for one source's records, in miles.
///
/// Comparison is strict: a distance exactly equal to a threshold resolves to
/// the lower tier.
pub struct RiskThresholds {
    /// Records strictly closer than this are High risk.
    pub high_within: f64,
    /// Records strictly closer than this (but not High) are Medium risk.
    pub medium_within: f64,
}

/// Classify a distance-driven record.
#[must_use]
pub fn classify_distance(distance_miles: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if distance_miles < thresholds.high_within {
        RiskLevel::High
    } else if distance_miles < thresholds.medium_within {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Classify a drinking-water violation from its health-based indicator.
///
/// Distance does not apply: water-system service areas do not map to
/// physical proximity the way site records do.
#[must_use]
pub fn classify_water(health_based: bool) -> RiskLevel {
    if health_based {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}
