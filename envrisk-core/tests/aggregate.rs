//! Orchestrator behavior driven end-to-end through fake source ports.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use envrisk_core::{
    AggregateError, Coordinates, GeoProfile, Location, RiskAggregator, RiskLevel, RiskThresholds,
    SiteCandidate, SiteCategory, SitePort, SourceError, SourceId, SourceMeta, SourcePlugin,
    SourceRegistry, WaterCandidate, WaterPort, distance_miles,
};

fn meta(id: &str, name: &str) -> SourceMeta {
    SourceMeta {
        id: SourceId(id.to_owned()),
        name: name.to_owned(),
    }
}

fn toxic_profile() -> GeoProfile {
    GeoProfile {
        category: SiteCategory::ToxicReleaseFacility,
        radius_miles: 15.0,
        thresholds: RiskThresholds {
            high_within: 1.0,
            medium_within: 5.0,
        },
    }
}

fn contaminated_profile() -> GeoProfile {
    GeoProfile {
        category: SiteCategory::ContaminatedSite,
        radius_miles: 2.0,
        thresholds: RiskThresholds {
            high_within: 0.5,
            medium_within: 1.0,
        },
    }
}

fn candidate(name: &str, distance_miles: f64) -> SiteCandidate {
    SiteCandidate {
        name: name.to_owned(),
        status: String::from("Active"),
        address: String::from("100 Test St"),
        contaminants: vec![String::from("Benzene")],
        distance_miles,
    }
}

fn violation(system: &str, health_based: bool) -> WaterCandidate {
    WaterCandidate {
        system_name: system.to_owned(),
        violation_type: String::from("MCL"),
        contaminant: String::from("Lead"),
        measured_level: Some(0.021),
        limit_level: Some(0.015),
        violation_date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid fixture date"),
        health_based,
    }
}

/// Site port answering with a fixed candidate list.
struct FixedSites {
    meta: SourceMeta,
    candidates: Vec<SiteCandidate>,
}

#[async_trait]
impl SitePort for FixedSites {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<SiteCandidate>, SourceError> {
        Ok(self.candidates.clone())
    }
}

/// Site port that always fails at the source boundary.
struct FailingSites {
    meta: SourceMeta,
}

#[async_trait]
impl SitePort for FailingSites {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<SiteCandidate>, SourceError> {
        Err(SourceError::Malformed(String::from("unexpected body")))
    }
}

/// Water port answering with a fixed violation list.
struct FixedWater {
    meta: SourceMeta,
    candidates: Vec<WaterCandidate>,
}

#[async_trait]
impl WaterPort for FixedWater {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<WaterCandidate>, SourceError> {
        Ok(self.candidates.clone())
    }
}

/// Water port that always fails at the source boundary.
struct FailingWater {
    meta: SourceMeta,
}

#[async_trait]
impl WaterPort for FailingWater {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, _location: &Location) -> Result<Vec<WaterCandidate>, SourceError> {
        Err(SourceError::DataAbsent(String::from("no rows for state")))
    }
}

fn sites_plugin(id: &str, profile: GeoProfile, candidates: Vec<SiteCandidate>) -> SourcePlugin {
    let source = meta(id, id);
    SourcePlugin::Sites {
        meta: source.clone(),
        profile,
        port: Arc::new(FixedSites {
            meta: source,
            candidates,
        }),
    }
}

fn baltimore() -> Location {
    let mut location = Location::new(39.2904, -76.6122);
    location.state = Some(String::from("MD"));
    location
}

#[tokio::test]
async fn all_sources_failing_still_returns_well_formed_result() {
    let sems = meta("sems", "Superfund sites");
    let tri = meta("tri", "Toxic releases");
    let sdwis = meta("sdwis", "Water violations");

    let registry = SourceRegistry::new(vec![
        SourcePlugin::Sites {
            meta: sems.clone(),
            profile: contaminated_profile(),
            port: Arc::new(FailingSites { meta: sems }),
        },
        SourcePlugin::Sites {
            meta: tri.clone(),
            profile: toxic_profile(),
            port: Arc::new(FailingSites { meta: tri }),
        },
        SourcePlugin::Water {
            meta: sdwis.clone(),
            port: Arc::new(FailingWater { meta: sdwis }),
        },
    ]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator
        .run(&baltimore())
        .await
        .expect("source failures must not abort the run");

    assert_eq!(result.errors.len(), 3, "one entry per failed source");
    assert!(result.contamination_sites.is_empty());
    assert!(result.toxic_facilities.is_empty());
    assert!(result.water_violations.is_empty());
}

#[tokio::test]
async fn one_failing_source_never_blocks_the_others() {
    let broken = meta("sems", "Superfund sites");
    let registry = SourceRegistry::new(vec![
        SourcePlugin::Sites {
            meta: broken.clone(),
            profile: contaminated_profile(),
            port: Arc::new(FailingSites { meta: broken }),
        },
        sites_plugin("tri", toxic_profile(), vec![candidate("ACME", 0.9)]),
    ]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator.run(&baltimore()).await.expect("run succeeds");

    assert_eq!(result.errors.len(), 1);
    assert!(
        result.errors[0].starts_with("Superfund sites:"),
        "error entries name the source: {:?}",
        result.errors
    );
    assert_eq!(result.toxic_facilities.len(), 1);
}

#[tokio::test]
async fn nearby_facility_is_kept_and_distant_one_filtered() {
    let origin = baltimore();

    // One facility ~0.3 miles north of the origin, one ~20 miles out.
    let near = distance_miles(
        origin.coordinates(),
        Coordinates {
            latitude: 39.2947,
            longitude: -76.6122,
        },
    );
    let far = distance_miles(
        origin.coordinates(),
        Coordinates {
            latitude: 39.5800,
            longitude: -76.6122,
        },
    );
    assert!(near < 0.5, "fixture sanity: near facility at {near}");
    assert!(far > 15.0, "fixture sanity: far facility at {far}");

    let registry = SourceRegistry::new(vec![sites_plugin(
        "tri",
        toxic_profile(),
        vec![candidate("FAR PLANT", far), candidate("NEAR PLANT", near)],
    )]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator.run(&origin).await.expect("run succeeds");

    assert_eq!(
        result.toxic_facilities.len(),
        1,
        "20 miles is outside the 15 mile radius"
    );
    assert_eq!(result.toxic_facilities[0].name, "NEAR PLANT");
    assert_eq!(result.toxic_facilities[0].risk_level, RiskLevel::High);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn toxic_duplicates_collapse_to_first_occurrence() {
    let registry = SourceRegistry::new(vec![sites_plugin(
        "tri",
        toxic_profile(),
        vec![
            candidate("ACME CHEMICAL", 1.20),
            candidate("ACME CHEMICAL", 1.24),
            candidate("OTHER WORKS", 2.0),
        ],
    )]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator.run(&baltimore()).await.expect("run succeeds");

    assert_eq!(result.toxic_facilities.len(), 2);
}

#[tokio::test]
async fn contamination_sites_merge_across_sources_sorted_by_distance() {
    let registry = SourceRegistry::new(vec![
        sites_plugin(
            "sems",
            contaminated_profile(),
            vec![candidate("LANDFILL", 1.5)],
        ),
        sites_plugin(
            "lust",
            GeoProfile {
                category: SiteCategory::ContaminatedSite,
                radius_miles: 1.0,
                thresholds: RiskThresholds {
                    high_within: 0.25,
                    medium_within: 0.5,
                },
            },
            vec![candidate("GAS STATION", 0.2)],
        ),
    ]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator.run(&baltimore()).await.expect("run succeeds");

    assert_eq!(result.contamination_sites.len(), 2);
    assert_eq!(
        result.contamination_sites[0].name, "GAS STATION",
        "merged list is nearest first"
    );
    assert_eq!(
        result.contamination_sites[0].risk_level,
        RiskLevel::High,
        "0.2 miles is under the tank source's 0.25 mile threshold"
    );
    assert_eq!(result.contamination_sites[1].risk_level, RiskLevel::Low);
}

#[tokio::test]
async fn health_based_water_violation_is_always_high() {
    let sdwis = meta("sdwis", "Water violations");
    let registry = SourceRegistry::new(vec![SourcePlugin::Water {
        meta: sdwis.clone(),
        port: Arc::new(FixedWater {
            meta: sdwis,
            candidates: vec![
                violation("CITY OF BALTIMORE", true),
                violation("SMALL MHP", false),
            ],
        }),
    }]);

    let aggregator = RiskAggregator::new(Arc::new(registry));
    let result = aggregator.run(&baltimore()).await.expect("run succeeds");

    assert_eq!(result.water_violations.len(), 2);
    assert_eq!(result.water_violations[0].risk_level, RiskLevel::High);
    assert_eq!(result.water_violations[1].risk_level, RiskLevel::Medium);
}

#[tokio::test]
async fn invalid_coordinates_fail_fast() {
    let registry = SourceRegistry::new(Vec::new());
    let aggregator = RiskAggregator::new(Arc::new(registry));

    let result = aggregator.run(&Location::new(f64::NAN, -76.6122)).await;

    assert!(
        matches!(result, Err(AggregateError::InvalidLocation { .. })),
        "missing latitude is a contract violation, not a partial result"
    );

    let result = aggregator.run(&Location::new(39.29, -200.0)).await;
    assert!(matches!(result, Err(AggregateError::InvalidLocation { .. })));
}
