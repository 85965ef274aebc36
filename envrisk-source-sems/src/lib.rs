//! Source adapter for the Superfund (SEMS) active contaminated-site listing.

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

/// Active site row from the SEMS listing.
///
/// Field presence varies between publication years, so everything is
/// defaulted and coordinates accept number or string.
#[derive(Debug, Deserialize)]
struct SiteRow {
    #[serde(rename = "SITE_NAME", default)]
    site_name: String,

    #[serde(rename = "NPL_STATUS_NAME", default)]
    npl_status: String,

    #[serde(rename = "STREET_ADDR_TXT", default)]
    street_address: String,

    #[serde(rename = "MEDIA_CONTAMINATED", default)]
    media_contaminated: String,

    #[serde(rename = "LATITUDE", default)]
    latitude: LooseCoordinate,

    #[serde(rename = "LONGITUDE", default)]
    longitude: LooseCoordinate,
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
    ///
    /// Zero is treated as absent: ungeocoded rows come through as 0/0.
    fn value(&self) -> Option<f64> {
        let parsed = match self {
            LooseCoordinate::Missing => None,
            LooseCoordinate::Number(value) => Some(*value),
            LooseCoordinate::Text(text) => text.trim().parse::<f64>().ok(),
        };
        parsed.filter(|value| value.is_finite() && *value != 0.0)
    }
}

/// Contaminated-site listing implementation backed by SEMS.
pub struct SemsSitePort {
    client: Client,
    meta: SourceMeta,
}

impl SemsSitePort {
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
impl SitePort for SemsSitePort {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<SiteCandidate>, SourceError> {
        // The listing service only filters by coarse keys, never by radius.
        let Some(state) = location
            .state
            .as_deref()
            .map(str::trim)
            .filter(|state| !state.is_empty())
        else {
            return Err(SourceError::DataAbsent(String::from(
                "SEMS queries need a state abbreviation",
            )));
        };

        let state = state.to_uppercase();
        let req = self
            .client
            .get(format!("{BASE_URL}/SEMS_ACTIVE_SITES/SITE_STATE/{state}/JSON"));

        let rows = fetch_json::<Vec<SiteRow>>(req).await?;

        let origin = location.coordinates();
        let candidates: Vec<SiteCandidate> = rows
            .into_iter()
            .filter_map(|row| to_candidate(row, origin))
            .collect();

        Ok(geo::nearest(candidates, RESULT_CAP))
    }
}

/// Build the plugin bundle for the SEMS source with its default profile.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin::Sites {
        meta: source_meta(),
        profile: default_profile(),
        port: Arc::new(SemsSitePort::new(client)),
    }
}

/// Default radius and risk thresholds for remediation sites.
#[must_use]
pub fn default_profile() -> GeoProfile {
    GeoProfile {
        category: SiteCategory::ContaminatedSite,
        radius_miles: 2.0,
        thresholds: RiskThresholds {
            high_within: 0.5,
            medium_within: 1.0,
        },
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("sems")),
        name: String::from("Superfund site listing"),
    }
}

/// Convert one raw row, or drop it when required fields are unusable.
fn to_candidate(row: SiteRow, origin: Coordinates) -> Option<SiteCandidate> {
    let name = row.site_name.trim();
    if name.is_empty() {
        tracing::debug!("skipping SEMS row without a site name");
        return None;
    }

    let (Some(latitude), Some(longitude)) = (row.latitude.value(), row.longitude.value()) else {
        tracing::debug!(site = name, "skipping SEMS row without usable coordinates");
        return None;
    };

    let distance = geo::distance_miles(
        origin,
        Coordinates {
            latitude,
            longitude,
        },
    );

    let status = row.npl_status.trim();
    let status = if status.is_empty() {
        String::from("Status unknown")
    } else {
        status.to_owned()
    };

    Some(SiteCandidate {
        name: name.to_owned(),
        status,
        address: row.street_address.trim().to_owned(),
        contaminants: split_media(&row.media_contaminated),
        distance_miles: distance,
    })
}

/// Split the semicolon-separated media field into individual entries.
fn split_media(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
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
