//! Aggregation orchestrator fanning out to all registered sources.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future;
use tokio::time::timeout;

use crate::dedupe::dedupe_sites;
use crate::geo;
use crate::model::{
    AggregationResult, Location, NormalizedSite, SiteCandidate, SiteCategory, SourceMeta,
    WaterCandidate, WaterViolation,
};
use crate::plugin::{GeoProfile, SourcePlugin, SourceRegistry};
use crate::ports::SourceError;
use crate::risk;

/// Ceiling for a single source fetch before it counts as failed.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
/// Fatal contract violations; source failures never surface here.
pub enum AggregateError {
    /// The location carries no usable coordinates.
    #[error("Invalid location: latitude {latitude}, longitude {longitude}")]
    InvalidLocation {
        /// Latitude that failed validation.
        latitude: f64,
        /// Longitude that failed validation.
        longitude: f64,
    },
}

/// Public entry point running one aggregation per call.
///
/// The aggregator holds no mutable run state: each call assembles a fresh
/// [`AggregationResult`], so a caller that drops a superseded run's future
/// cancels its in-flight requests and stale partial data is never observed.
pub struct RiskAggregator {
    registry: Arc<SourceRegistry>,
    fetch_timeout: Duration,
}

/// Settled outcome of one source fetch, folded in after the join.
enum Fetched {
    Sites {
        meta: SourceMeta,
        profile: GeoProfile,
        outcome: Result<Vec<SiteCandidate>, String>,
    },
    Water {
        meta: SourceMeta,
        outcome: Result<Vec<WaterCandidate>, String>,
    },
}

impl RiskAggregator {
    /// Create a new aggregator bound to the provided registry.
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the per-source fetch ceiling.
    #[must_use]
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Run one aggregation for the given location.
    ///
    /// Every registered source is fetched concurrently and awaited until all
    /// have settled; a source's failure or timeout becomes one entry in
    /// [`AggregationResult::errors`] and never prevents assembly of the
    /// other sources' results. There is no retry: re-invoke to try again.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidLocation`] when the location carries
    /// no usable coordinates. This is the only fatal condition.
    pub async fn run(&self, location: &Location) -> Result<AggregationResult, AggregateError> {
        validate(location)?;
        tracing::info!(
            latitude = location.latitude,
            longitude = location.longitude,
            sources = self.registry.len(),
            "starting aggregation run"
        );

        let fetches = self
            .registry
            .plugins()
            .map(|plugin| self.fetch(plugin, location));
        let settled = future::join_all(fetches).await;

        let mut contamination_sites = Vec::new();
        let mut toxic_facilities = Vec::new();
        let mut water_violations = Vec::new();
        let mut errors = Vec::new();

        for fetched in settled {
            match fetched {
                Fetched::Sites {
                    meta,
                    profile,
                    outcome,
                } => match outcome {
                    Ok(candidates) => {
                        let within = geo::filter_within_radius(candidates, profile.radius_miles);
                        tracing::debug!(
                            source = %meta.id.0,
                            kept = within.len(),
                            radius_miles = profile.radius_miles,
                            "geofiltered site candidates"
                        );
                        for candidate in within {
                            let site = normalize(candidate, &profile);
                            if profile.category == SiteCategory::ToxicReleaseFacility {
                                toxic_facilities.push(site);
                            } else {
                                contamination_sites.push(site);
                            }
                        }
                    }
                    Err(message) => errors.push(format!("{}: {message}", meta.name)),
                },
                Fetched::Water { meta, outcome } => match outcome {
                    Ok(candidates) => {
                        tracing::debug!(source = %meta.id.0, kept = candidates.len(), "water violations fetched");
                        water_violations.extend(candidates.into_iter().map(classify_violation));
                    }
                    Err(message) => errors.push(format!("{}: {message}", meta.name)),
                },
            }
        }

        let mut toxic_facilities = dedupe_sites(toxic_facilities);
        sort_by_distance(&mut contamination_sites);
        sort_by_distance(&mut toxic_facilities);

        Ok(AggregationResult {
            contamination_sites,
            toxic_facilities,
            water_violations,
            errors,
            completed_at: Utc::now(),
        })
    }

    async fn fetch(&self, plugin: &SourcePlugin, location: &Location) -> Fetched {
        match plugin {
            SourcePlugin::Sites {
                meta,
                profile,
                port,
            } => {
                let outcome = self.settle(meta, port.fetch(location)).await;
                Fetched::Sites {
                    meta: meta.clone(),
                    profile: *profile,
                    outcome,
                }
            }
            SourcePlugin::Water { meta, port } => {
                let outcome = self.settle(meta, port.fetch(location)).await;
                Fetched::Water {
                    meta: meta.clone(),
                    outcome,
                }
            }
        }
    }

    /// Await one fetch under the timeout, reducing it to data or a message.
    async fn settle<T>(
        &self,
        meta: &SourceMeta,
        fetch: impl Future<Output = Result<Vec<T>, SourceError>>,
    ) -> Result<Vec<T>, String> {
        match timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(err)) => {
                tracing::warn!(source = %meta.id.0, error = %err, "source fetch failed");
                Err(err.to_string())
            }
            Err(_elapsed) => {
                tracing::warn!(source = %meta.id.0, "source fetch timed out");
                Err(format!(
                    "timed out after {}s",
                    self.fetch_timeout.as_secs()
                ))
            }
        }
    }
}

fn validate(location: &Location) -> Result<(), AggregateError> {
    let latitude = location.latitude;
    let longitude = location.longitude;

    let usable = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if usable {
        Ok(())
    } else {
        Err(AggregateError::InvalidLocation {
            latitude,
            longitude,
        })
    }
}

fn normalize(candidate: SiteCandidate, profile: &GeoProfile) -> NormalizedSite {
    let risk_level = risk::classify_distance(candidate.distance_miles, &profile.thresholds);

    NormalizedSite {
        name: candidate.name,
        category: profile.category,
        status: candidate.status,
        distance_miles: candidate.distance_miles,
        address: candidate.address,
        contaminants: candidate.contaminants,
        risk_level,
    }
}

fn classify_violation(candidate: WaterCandidate) -> WaterViolation {
    WaterViolation {
        risk_level: risk::classify_water(candidate.health_based),
        system_name: candidate.system_name,
        violation_type: candidate.violation_type,
        contaminant: candidate.contaminant,
        measured_level: candidate.measured_level,
        limit_level: candidate.limit_level,
        violation_date: candidate.violation_date,
    }
}

fn sort_by_distance(sites: &mut [NormalizedSite]) {
    sites.sort_by(|left, right| left.distance_miles.total_cmp(&right.distance_miles));
}
