/// Incident enrichment module
///
/// This module provides the enrichment pipeline for one base incident:
/// - Record normalization of descriptive fields
/// - Artifact listing for the base incident
/// - Cross-incident correlation (see `crate::correlation`)
/// - Minimal-detail lookups of related incidents
/// - Bounded concurrent fan-out with cancellation
/// - Strict or lenient handling of failed sub-queries

pub mod artifacts;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod models;
pub mod normalizer;
pub mod resolver;
pub mod service;

pub use artifacts::ArtifactFetcher;
pub use cancel::{CancellationSignal, CancellationToken, Cancelled};
pub use error::{
    CorrelationQueryError, EnrichmentError, EnrichmentResult, FetchError, RelatedFetchError,
};
pub use executor::BoundedExecutor;
pub use models::{EnrichmentOutcome, EnrichmentReport, SkippedRelated};
pub use normalizer::normalize_record;
pub use resolver::{RelatedIncidentResolver, ResolvedIncidents};
pub use service::IncidentEnrichmentService;
