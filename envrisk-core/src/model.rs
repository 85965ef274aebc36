//! Domain data structures for locations, risk records, and aggregation output.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic point used for distance calculations.
pub struct Coordinates {
    /// Latitude in decimal degrees, north positive.
    pub latitude: f64,
    /// Longitude in decimal degrees, east positive.
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Point of interest supplied by the geocoding collaborator.
///
/// Immutable once supplied; every distance in an aggregation run is measured
/// from this origin.
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Free-text address as entered by the user.
    pub address: String,
    /// Two-letter state abbreviation, when known.
    pub state: Option<String>,
    /// Five-digit zip code, when known.
    pub zip: Option<String>,
    /// County name, when known.
    pub county: Option<String>,
}

impl Location {
    /// Build a location from bare coordinates.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: String::new(),
            state: None,
            zip: None,
            county: None,
        }
    }

    /// Coordinate pair of this location.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Kind of physical record an environmental source reports.
pub enum SiteCategory {
    /// Contaminated or remediation site, including tank leak incidents.
    ContaminatedSite,
    /// Facility reporting releases of toxic chemicals.
    ToxicReleaseFacility,
    /// Public drinking-water system.
    WaterSystem,
}

impl fmt::Display for SiteCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            SiteCategory::ContaminatedSite => "contaminated-site",
            SiteCategory::ToxicReleaseFacility => "toxic-release-facility",
            SiteCategory::WaterSystem => "water-system",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Coarse risk tier assigned to every record.
pub enum RiskLevel {
    /// Immediate proximity or a health-based violation.
    High,
    /// Within the zone of plausible influence.
    Medium,
    /// Present but distant.
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        };
        write!(formatter, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a data source known to envrisk.
pub struct SourceId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a data source and its human-friendly name.
pub struct SourceMeta {
    /// Unique identifier.
    pub id: SourceId,
    /// Human-friendly display name.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Intermediate site record produced by an adapter before classification.
///
/// The distance is computed at row-conversion time through
/// [`crate::geo::distance_miles`] so every component sees the same value.
pub struct SiteCandidate {
    /// Facility or site name as reported by the source.
    pub name: String,
    /// Source-reported status, e.g. remediation phase.
    pub status: String,
    /// Street address, possibly empty when the source omits it.
    pub address: String,
    /// Contaminants or substances associated with the record.
    pub contaminants: Vec<String>,
    /// Great-circle distance from the aggregation origin, in miles.
    pub distance_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Canonical shape for a physical location of concern.
pub struct NormalizedSite {
    /// Facility or site name.
    pub name: String,
    /// Record category.
    pub category: SiteCategory,
    /// Source-reported status.
    pub status: String,
    /// Great-circle distance from the aggregation origin, in miles.
    pub distance_miles: f64,
    /// Street address.
    pub address: String,
    /// Contaminants or substances associated with the record.
    pub contaminants: Vec<String>,
    /// Risk tier assigned by the classifier, never set ad hoc.
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Intermediate drinking-water violation record produced by an adapter.
pub struct WaterCandidate {
    /// Name of the water system the violation belongs to.
    pub system_name: String,
    /// Violation category reported by the source.
    pub violation_type: String,
    /// Contaminant the violation concerns.
    pub contaminant: String,
    /// Measured level, in the source's units, when reported.
    pub measured_level: Option<f64>,
    /// Regulatory limit the measurement is compared against, when reported.
    pub limit_level: Option<f64>,
    /// Date the violation period began.
    pub violation_date: NaiveDate,
    /// Whether the source flags the violation as health-based.
    pub health_based: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Drinking-water violation in its output shape.
///
/// Water systems are matched by zip/state of record rather than geofiltered,
/// and their risk tier derives from the health-based indicator instead of
/// distance.
pub struct WaterViolation {
    /// Name of the water system the violation belongs to.
    pub system_name: String,
    /// Violation category reported by the source.
    pub violation_type: String,
    /// Contaminant the violation concerns.
    pub contaminant: String,
    /// Measured level, in the source's units, when reported.
    pub measured_level: Option<f64>,
    /// Regulatory limit the measurement is compared against, when reported.
    pub limit_level: Option<f64>,
    /// Date the violation period began.
    pub violation_date: NaiveDate,
    /// Risk tier assigned by the classifier.
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Result of one complete aggregation run.
///
/// Created fresh per run and never mutated afterwards; a later run for a new
/// location supersedes it entirely.
pub struct AggregationResult {
    /// Contaminated/remediation sites within their source radius, nearest first.
    pub contamination_sites: Vec<NormalizedSite>,
    /// Toxic-release facilities within their source radius, deduplicated, nearest first.
    pub toxic_facilities: Vec<NormalizedSite>,
    /// Drinking-water violations for the location's zip/state, newest first.
    pub water_violations: Vec<WaterViolation>,
    /// One human-readable entry per source that failed this run.
    pub errors: Vec<String>,
    /// Timestamp taken when assembly finished.
    pub completed_at: DateTime<Utc>,
}
