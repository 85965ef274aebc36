//! Traits describing source adapter capabilities and shared error types.

use async_trait::async_trait;
use reqwest::{Error as ReqwestError, StatusCode};

use crate::model::{Location, SiteCandidate, SourceMeta, WaterCandidate};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to an external data source.
///
/// All variants are source-local: the orchestrator converts them into a
/// per-source entry in the aggregate error list and carries on.
pub enum SourceError {
    /// Network layer failed before a response arrived.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {0}")]
    Status(StatusCode),
    /// Response body could not be parsed as expected.
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// The jurisdiction has no extract or rows to query.
    #[error("No data available: {0}")]
    DataAbsent(String),
}

#[async_trait]
/// Trait for adapters reporting physical sites or facilities.
///
/// Implementations must skip malformed individual rows rather than failing
/// the whole fetch, and must cap their result count by keeping the nearest
/// candidates (sort ascending by distance, then truncate).
pub trait SitePort: Send + Sync {
    /// Metadata describing the source handled by this port.
    fn meta(&self) -> &SourceMeta;

    /// Fetch candidate records near the given location.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the source request fails as a whole;
    /// individual unusable rows are dropped silently.
    async fn fetch(&self, location: &Location) -> Result<Vec<SiteCandidate>, SourceError>;
}

#[async_trait]
/// Trait for adapters reporting drinking-water violations.
///
/// Water records are keyed by the location's zip or state rather than
/// filtered by distance.
pub trait WaterPort: Send + Sync {
    /// Metadata describing the source handled by this port.
    fn meta(&self) -> &SourceMeta;

    /// Fetch violation records for the location's zip or state.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the source request fails as a whole;
    /// individual unusable rows are dropped silently.
    async fn fetch(&self, location: &Location) -> Result<Vec<WaterCandidate>, SourceError>;
}
