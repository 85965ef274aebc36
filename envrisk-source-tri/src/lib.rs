//! Bulk-extract adapter for the per-state Toxics Release Inventory file.
//!
//! Unlike the query-service sources, TRI publishes one downloadable tabular
//! extract per state and year. The whole file is fetched and scanned row by
//! row; only the nearest reporting facilities survive the result cap.

use std::sync::Arc;

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use reqwest::{Client, StatusCode};

use envrisk_core::{
    geo,
    model::{Coordinates, Location, SiteCandidate, SiteCategory, SourceId, SourceMeta},
    plugin::{GeoProfile, SourcePlugin},
    ports::{SitePort, SourceError},
    risk::RiskThresholds,
};

const BASE_URL: &str = "https://data.epa.gov/datasets/tri";

/// Reporting year of the current basic data files.
const EXTRACT_YEAR: u32 = 2023;

/// Hard cap on rows scanned per extract, independent of how many match.
const SCAN_CAP: usize = 50_000;

/// Most results returned from one fetch; nearest matches win.
const RESULT_CAP: usize = 25;

// Exact header names drift between years ("4. FACILITY NAME" vs
// "FACILITY NAME"), so columns are located by substring token, never by
// position.
const NAME_TOKEN: &str = "FACILITY NAME";
const LATITUDE_TOKEN: &str = "LATITUDE";
const LONGITUDE_TOKEN: &str = "LONGITUDE";
const CHEMICAL_TOKEN: &str = "CHEMICAL";
const ADDRESS_TOKEN: &str = "STREET ADDRESS";
const SECTOR_TOKEN: &str = "INDUSTRY SECTOR";

/// Column indices resolved from one extract's header row.
struct Columns {
    name: usize,
    latitude: usize,
    longitude: usize,
    chemical: Option<usize>,
    address: Option<usize>,
    sector: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, SourceError> {
        let required = |token: &str| {
            find_column(headers, token).ok_or_else(|| {
                SourceError::Malformed(format!("extract has no column matching {token:?}"))
            })
        };

        Ok(Self {
            name: required(NAME_TOKEN)?,
            latitude: required(LATITUDE_TOKEN)?,
            longitude: required(LONGITUDE_TOKEN)?,
            chemical: find_column(headers, CHEMICAL_TOKEN),
            address: find_column(headers, ADDRESS_TOKEN),
            sector: find_column(headers, SECTOR_TOKEN),
        })
    }
}

fn find_column(headers: &StringRecord, token: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.to_uppercase().contains(token))
}

/// Reporting facility listing backed by the TRI basic data file.
pub struct TriSitePort {
    client: Client,
    meta: SourceMeta,
}

impl TriSitePort {
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
impl SitePort for TriSitePort {
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
                "the TRI extract is selected by state",
            )));
        };

        let state = state.to_lowercase();
        let url = format!("{BASE_URL}/{EXTRACT_YEAR}/tri_{EXTRACT_YEAR}_{state}.csv");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(SourceError::Network)?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::DataAbsent(format!(
                "no TRI extract published for {state}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let body = resp
            .text()
            .await
            .map_err(|err| SourceError::Malformed(err.to_string()))?;

        let candidates = parse_extract(&body, location.coordinates())?;
        Ok(geo::nearest(candidates, RESULT_CAP))
    }
}

/// Build the plugin bundle for the TRI source with its default profile.
#[must_use]
pub fn plugin(client: Client) -> SourcePlugin {
    SourcePlugin::Sites {
        meta: source_meta(),
        profile: default_profile(),
        port: Arc::new(TriSitePort::new(client)),
    }
}

/// Default radius and risk thresholds for reporting facilities.
///
/// Wider than point sites: reporting facilities influence air and water
/// quality over a larger footprint than a single leak.
#[must_use]
pub fn default_profile() -> GeoProfile {
    GeoProfile {
        category: SiteCategory::ToxicReleaseFacility,
        radius_miles: 15.0,
        thresholds: RiskThresholds {
            high_within: 1.0,
            medium_within: 5.0,
        },
    }
}

fn source_meta() -> SourceMeta {
    SourceMeta {
        id: SourceId(String::from("tri")),
        name: String::from("Toxics Release Inventory"),
    }
}

/// Parse the delimited extract body into candidates around the origin.
fn parse_extract(body: &str, origin: Coordinates) -> Result<Vec<SiteCandidate>, SourceError> {
    parse_extract_capped(body, origin, SCAN_CAP)
}

/// Scan at most `scan_cap` rows; broken rows are dropped, never the extract.
fn parse_extract_capped(
    body: &str,
    origin: Coordinates,
    scan_cap: usize,
) -> Result<Vec<SiteCandidate>, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| SourceError::Malformed(err.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut candidates = Vec::new();
    let mut scanned = 0_usize;

    for record in reader.records() {
        if scanned >= scan_cap {
            tracing::debug!(cap = scan_cap, "stopping extract scan at the row cap");
            break;
        }
        scanned += 1;

        let Ok(record) = record else {
            continue;
        };

        if let Some(candidate) = to_candidate(&record, &columns, origin) {
            candidates.push(candidate);
        }
    }

    Ok(candidates)
}

/// Convert one extract row, or drop it when required fields are unusable.
fn to_candidate(record: &StringRecord, columns: &Columns, origin: Coordinates) -> Option<SiteCandidate> {
    let name = record.get(columns.name)?.trim();
    if name.is_empty() {
        return None;
    }

    let latitude = parse_coordinate(record.get(columns.latitude))?;
    let longitude = parse_coordinate(record.get(columns.longitude))?;

    let distance = geo::distance_miles(
        origin,
        Coordinates {
            latitude,
            longitude,
        },
    );

    let field = |index: Option<usize>| {
        index
            .and_then(|position| record.get(position))
            .map_or("", str::trim)
    };

    let contaminants = match field(columns.chemical) {
        "" => Vec::new(),
        chemical => vec![chemical.to_owned()],
    };

    let status = match field(columns.sector) {
        "" => String::from("Reporting facility"),
        sector => format!("Reporting facility ({sector})"),
    };

    Some(SiteCandidate {
        name: name.to_owned(),
        status,
        address: field(columns.address).to_owned(),
        contaminants,
        distance_miles: distance,
    })
}

/// Accept only finite, non-zero coordinate text.
fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use envrisk_core::risk::classify_distance;

    const BALTIMORE: Coordinates = Coordinates {
        latitude: 39.2904,
        longitude: -76.6122,
    };

    #[test]
    fn columns_are_found_by_header_substring() {
        let body = "1. YEAR,4. FACILITY NAME,12. LATITUDE,13. LONGITUDE,34. CHEMICAL\n\
                    2023,HARBOR PLATING,39.2947,-76.6122,Nickel\n";

        let candidates = parse_extract(body, BALTIMORE).expect("extract parses");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "HARBOR PLATING");
        assert_eq!(candidates[0].contaminants, vec!["Nickel"]);
    }

    #[test]
    fn missing_required_column_is_malformed() {
        let body = "4. FACILITY NAME,34. CHEMICAL\nHARBOR PLATING,Nickel\n";

        let result = parse_extract(body, BALTIMORE);

        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[test]
    fn quoted_fields_may_contain_the_delimiter() {
        let body = "FACILITY NAME,LATITUDE,LONGITUDE,CHEMICAL\n\
                    \"SMITH, JONES & CO\",39.2947,-76.6122,Lead\n";

        let candidates = parse_extract(body, BALTIMORE).expect("extract parses");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "SMITH, JONES & CO");
    }

    #[test]
    fn zero_or_unparseable_coordinates_skip_the_row() {
        let body = "FACILITY NAME,LATITUDE,LONGITUDE\n\
                    UNGEOCODED,0.0,0.0\n\
                    BROKEN,not-a-number,-76.61\n\
                    NAN ROW,NaN,-76.61\n\
                    GOOD,39.2947,-76.6122\n";

        let candidates = parse_extract(body, BALTIMORE).expect("extract parses");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "GOOD");
    }

    #[test]
    fn scan_cap_bounds_rows_examined() {
        let mut body = String::from("FACILITY NAME,LATITUDE,LONGITUDE\n");
        for index in 0..10 {
            body.push_str(&format!("PLANT {index},39.2947,-76.6122\n"));
        }

        let candidates = parse_extract_capped(&body, BALTIMORE, 3).expect("extract parses");

        assert_eq!(candidates.len(), 3, "rows past the cap are never examined");
    }

    #[test]
    fn nearby_facility_survives_filter_and_classifies_high() {
        // ~0.3 miles and ~20 miles north of the Baltimore origin
        let body = "FACILITY NAME,LATITUDE,LONGITUDE,CHEMICAL\n\
                    NEAR PLANT,39.2947,-76.6122,Benzene\n\
                    FAR PLANT,39.5800,-76.6122,Benzene\n";

        let profile = default_profile();
        let candidates = parse_extract(body, BALTIMORE).expect("extract parses");
        let within = geo::filter_within_radius(candidates, profile.radius_miles);

        assert_eq!(within.len(), 1, "20 miles is outside the 15 mile radius");
        assert_eq!(within[0].name, "NEAR PLANT");
        assert_eq!(
            classify_distance(within[0].distance_miles, &profile.thresholds),
            envrisk_core::model::RiskLevel::High
        );
    }
}
