//! Source adapter for leaking underground storage tank (LUST) incidents.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use envrisk_core::{
    geo,
    model::{Coordinates, Location, SiteCandidate, SiteCategory, SourceId, SourceMeta},
    plugin::{GeoProfile, SourcePlugin},
    ports::{SitePort, SourceError},
    risk::RiskThresholds,
};

const BASE_URL: &str = "https://data.epa.gov/efservice";

/// Most results returned from one fetch; nearest matches win.
const RESULT_CAP: usize = 25;

/// Incident row from the tank release listing.
#[derive(Debug, Deserialize)]
struct IncidentRow {
    #[serde(rename = "FACILITY_NAME", default)]
    facility_name: String,

    // older vintages of the listing use SITE_NAME instead
    #[serde(rename = "SITE_NAME", default)]
    site_name: String,

    #[serde(rename = "RELEASE_STATUS", default)]
    release_status: String,

    #[serde(rename = "ADDRESS", default)]
    address: String,

    #[serde(rename = "SUBSTANCE", default)]
    substance: String,

    #[serde(rename = "LATITUDE", default)]
    latitude: LooseCoordinate,

    #[serde(rename = "LONGITUDE", default)]
    longitude: LooseCoordinate,
}

impl IncidentRow {
    /// Facility name with the legacy fallback applied.
    fn name(&self) -> &str {
        let trimmed = self.facility_name.trim();
        if trimmed.is_empty() {
            self.site_name.trim()
        } else {
            trimmed
        }
    }
}

/// Coordinate field that upstream serialises as number, string, or null.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum LooseCoordinate {
    /// Field absent or null.
    #[default]
    Missing,
    /// Plain JSON number.
    Number(f64),
    /// Number wrapped in a string.
    Text(String),
}

impl LooseCoordinate {
    /// Finite non-zero value, if the row carries one.
    fn value(&self) -> Option<f64> {
        let parsed = match self {
            LooseCoordinate::Missing => None,
            LooseCoordinate::Number(value) => Some(*value),
            LooseCoordinate::Text(text) => text.trim().parse::<f64>().ok(),
        };
        parsed.filter(|value| value.is_finite() && *value != 0.0)
    }
}

/// Tank incident listing implementation.
pub struct LustSitePort {
    client: Client,
    meta: SourceMeta,
}

impl LustSitePort {
    /// Create a new port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            meta: source_meta(),
        }
    }
}

#[async_trait]
impl SitePort for LustSitePort {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<SiteCandidate>, SourceError> {
        let Some(state) = location
            .state
            .as_deref()
            .map(str::trim)
            .filter(|state| !state.is_empty())
        else {
            return Err(SourceError::DataAbsent(String::from(
                "tank incident queries need a state abbreviation",
            )));
        };

        let state = state.to_uppercase();
        let req = self
            .client
            .get(format!("{BASE_URL}/LUST_INCIDENTS/STATE_CODE/{state}/JSON"));

        let rows = fetch_json::<Vec<IncidentRow>>(req).await?;

        let origin = location.coordinates();
        let candidates: Vec<SiteCandidate> = rows
            .into_iter()
            .filter_map(|row| to_candidate(row, origin))
            .collect();

        Ok(geo::nearest(candidates, RESULT_CAP))
    }
}

/// Build the plugin bundle for the tank incident source with its default profile.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin::Sites {
        meta: source_meta(),
        profile: default_profile(),
        port: Arc::new(LustSitePort::new(client)),
    }
}

/// Default radius and risk thresholds for point leaks.
///
/// Tighter than remediation sites: a tank leak's zone of plausible
/// influence is small.
#[must_use]
pub fn default_profile() -> GeoProfile {
    GeoProfile {
        category: SiteCategory::ContaminatedSite,
        radius_miles: 1.0,
        thresholds: RiskThresholds {
            high_within: 0.25,
            medium_within: 0.5,
        },
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("lust")),
        name: String::from("Leaking tank incidents"),
    }
}

/// Convert one raw row, or drop it when required fields are unusable.
fn to_candidate(row: IncidentRow, origin: Coordinates) -> Option<SiteCandidate> {
    let name = row.name();
    if name.is_empty() {
        tracing::debug!("skipping tank incident row without a facility name");
        return None;
    }

    let (Some(latitude), Some(longitude)) = (row.latitude.value(), row.longitude.value()) else {
        tracing::debug!(facility = name, "skipping tank incident row without usable coordinates");
        return None;
    };

    let distance = geo::distance_miles(
        origin,
        Coordinates {
            latitude,
            longitude,
        },
    );

    let substance = row.substance.trim();
    let contaminants = if substance.is_empty() {
        Vec::new()
    } else {
        vec![substance.to_owned()]
    };

    Some(SiteCandidate {
        name: name.to_owned(),
        status: map_release_status(&row.release_status),
        address: row.address.trim().to_owned(),
        contaminants,
        distance_miles: distance,
    })
}

/// Map the listing's one-letter release status codes to readable labels.
fn map_release_status(raw: &str) -> String {
    let code = raw.trim();

    match code.to_uppercase().as_str() {
        "O" => String::from("Open release"),
        "C" => String::from("Cleanup completed"),
        "R" => String::from("Remediation in progress"),
        "" => String::from("Status unknown"),
        _ => code.to_owned(),
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, SourceError> {
    let resp = req.send().await.map_err(SourceError::Network)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }

    resp.json()
        .await
        .map_err(|err| SourceError::Malformed(err.to_string()))
}
