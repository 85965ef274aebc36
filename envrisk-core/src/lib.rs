//! Core types and service wiring for the envrisk environmental-risk aggregator.

/// First-occurrence-wins collapsing of near-duplicate facility records.
pub mod dedupe;
/// Great-circle distance and radius filtering.
pub mod geo;
/// Domain models shared by all sources.
pub mod model;
/// Registry and helpers for plugging source adapters into the service.
pub mod plugin;
/// Traits describing the source adapter interfaces.
pub mod ports;
/// Distance- and indicator-driven risk tiers.
pub mod risk;
/// High-level aggregation service used by clients.
pub mod service;

pub use dedupe::*;
pub use geo::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use risk::*;
pub use service::*;
