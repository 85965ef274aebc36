//! Registry for all source plugins and their ports.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{SiteCategory, SourceMeta};
use crate::ports::{SitePort, WaterPort};
use crate::risk::RiskThresholds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
/// Geospatial configuration carried by a site source.
///
/// Each source crate supplies its default profile; embedders may tune the
/// radius and thresholds without touching the adapter.
pub struct GeoProfile {
    /// Category this source's records fall into.
    pub category: SiteCategory,
    /// Inclusion radius around the aggregation origin, in miles.
    pub radius_miles: f64,
    /// Distance thresholds for the risk classifier.
    pub thresholds: RiskThresholds,
}

/// A registered source: its metadata plus the port implementing it.
pub enum SourcePlugin {
    /// Source reporting physical sites, geofiltered by its profile.
    Sites {
        /// Static metadata describing the source.
        meta: SourceMeta,
        /// Radius and risk thresholds for this source's records.
        profile: GeoProfile,
        /// Implementation fetching candidate records.
        port: Arc<dyn SitePort>,
    },
    /// Source reporting drinking-water violations, keyed by zip/state.
    Water {
        /// Static metadata describing the source.
        meta: SourceMeta,
        /// Implementation fetching violation records.
        port: Arc<dyn WaterPort>,
    },
}

impl SourcePlugin {
    /// Metadata of the underlying source.
    #[must_use]
    pub fn meta(&self) -> &SourceMeta {
        match self {
            SourcePlugin::Sites { meta, .. } | SourcePlugin::Water { meta, .. } => meta,
        }
    }
}

/// Registry holding every source consulted by an aggregation run.
pub struct SourceRegistry {
    plugins: Vec<SourcePlugin>,
}

impl SourceRegistry {
    /// Build a registry from the provided plugin list.
    #[must_use]
    pub fn new(plugins: Vec<SourcePlugin>) -> Self {
        Self { plugins }
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the registry holds no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Metadata for all registered sources.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceMeta> {
        self.plugins
            .iter()
            .map(|plugin| plugin.meta().clone())
            .collect()
    }

    /// Iterator over all registered plugins.
    pub fn plugins(&self) -> impl Iterator<Item = &SourcePlugin> {
        self.plugins.iter()
    }
}
