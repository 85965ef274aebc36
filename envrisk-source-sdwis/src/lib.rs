//! Source adapter for Safe Drinking Water Information System violations.
//!
//! Water systems serve areas, not points, so this source is keyed by the
//! location's zip code (state as fallback) and is never geofiltered.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use envrisk_core::{
    model::{Location, SourceId, SourceMeta, WaterCandidate},
    plugin::SourcePlugin,
    ports::{SourceError, WaterPort},
};

const BASE_URL: &str = "https://data.epa.gov/efservice";

/// Most violations returned from one fetch; newest win.
const RESULT_CAP: usize = 15;

const DATE_FORMAT: &str = "%Y-%m-%d";
// pre-2016 vintages of the listing use Oracle-style dates ("15-JAN-09")
const LEGACY_DATE_FORMAT: &str = "%d-%b-%y";

/// Violation row from the SDWIS listing.
#[derive(Debug, Deserialize)]
struct ViolationRow {
    #[serde(rename = "PWS_NAME", default)]
    system_name: String,

    #[serde(rename = "VIOLATION_CATEGORY_DESC", default)]
    violation_type: String,

    #[serde(rename = "CONTAMINANT_NAME", default)]
    contaminant: String,

    #[serde(rename = "VIOL_MEASURE", default)]
    measured_level: LooseNumber,

    #[serde(rename = "FEDERAL_MCL", default)]
    limit_level: LooseNumber,

    #[serde(rename = "COMPL_PER_BEGIN_DATE", default)]
    begin_date: String,

    #[serde(rename = "IS_HEALTH_BASED_IND", default)]
    health_based: String,
}

/// Numeric field that upstream serialises as number, string, or null.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    /// Field absent or null.
    #[default]
    Missing,
    /// Plain JSON number.
    Number(f64),
    /// Number wrapped in a string.
    Text(String),
}

impl LooseNumber {
    /// Finite value, if the row carries one.
    ///
    /// Zero is a legitimate limit (some contaminants have an MCL goal of
    /// zero), so only non-finite values are rejected here.
    fn value(&self) -> Option<f64> {
        let parsed = match self {
            LooseNumber::Missing => None,
            LooseNumber::Number(value) => Some(*value),
            LooseNumber::Text(text) => text.trim().parse::<f64>().ok(),
        };
        parsed.filter(|value| value.is_finite())
    }
}

/// Drinking-water violation listing implementation backed by SDWIS.
pub struct SdwisWaterPort {
    client: Client,
    meta: SourceMeta,
}

impl SdwisWaterPort {
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
impl WaterPort for SdwisWaterPort {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    async fn fetch(&self, location: &Location) -> Result<Vec<WaterCandidate>, SourceError> {
        let zip = location
            .zip
            .as_deref()
            .map(str::trim)
            .filter(|zip| !zip.is_empty());
        let state = location
            .state
            .as_deref()
            .map(str::trim)
            .filter(|state| !state.is_empty());

        let req = match (zip, state) {
            (Some(zip), _) => self
                .client
                .get(format!("{BASE_URL}/VIOLATION/ZIPCODE_SERVED/{zip}/JSON")),
            (None, Some(state)) => {
                let state = state.to_uppercase();
                self.client.get(format!(
                    "{BASE_URL}/VIOLATION/PRIMACY_AGENCY_CODE/{state}/JSON"
                ))
            }
            (None, None) => {
                return Err(SourceError::DataAbsent(String::from(
                    "water system lookups need a zip code or state",
                )));
            }
        };

        let rows = fetch_json::<Vec<ViolationRow>>(req).await?;

        let mut candidates: Vec<WaterCandidate> =
            rows.into_iter().filter_map(to_candidate).collect();

        // newest violations are the actionable ones
        candidates.sort_by(|left, right| right.violation_date.cmp(&left.violation_date));
        candidates.truncate(RESULT_CAP);

        Ok(candidates)
    }
}

/// Build the plugin bundle for the SDWIS source.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin::Water {
        meta: source_meta(),
        port: Arc::new(SdwisWaterPort::new(client)),
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("sdwis")),
        name: String::from("Drinking water violations"),
    }
}

/// Convert one raw row, or drop it when required fields are unusable.
fn to_candidate(row: ViolationRow) -> Option<WaterCandidate> {
    let system_name = row.system_name.trim();
    if system_name.is_empty() {
        tracing::debug!("skipping violation row without a system name");
        return None;
    }

    let Some(violation_date) = parse_date(&row.begin_date) else {
        tracing::debug!(system = system_name, "skipping violation row without a usable date");
        return None;
    };

    Some(WaterCandidate {
        system_name: system_name.to_owned(),
        violation_type: labelled(&row.violation_type, "Unspecified violation"),
        contaminant: labelled(&row.contaminant, "Unspecified contaminant"),
        measured_level: row.measured_level.value(),
        limit_level: row.limit_level.value(),
        violation_date,
        health_based: is_affirmative(&row.health_based),
    })
}

fn labelled(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// The listing flags health-based violations with Y/N (occasionally spelled out).
fn is_affirmative(raw: &str) -> bool {
    matches!(raw.trim(), "Y" | "y" | "Yes" | "YES" | "true" | "TRUE")
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, LEGACY_DATE_FORMAT))
        .ok()
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
