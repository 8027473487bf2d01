//! Cross-incident artifact correlation for SOAR case-management backends.
//!
//! Given an incident id, [`enrichment::IncidentEnrichmentService`] fetches the full
//! incident, lists its artifacts, searches every artifact value across all incidents
//! and attaches the minimal records of the other incidents that share one.

pub mod backend;
pub mod config;
pub mod correlation;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod notes;
pub mod observability;

pub use config::{ArtifactListing, Config, FailurePolicy};
pub use enrichment::{EnrichmentError, EnrichmentOutcome, IncidentEnrichmentService};
pub use error::{AppError, Result};
pub use models::{Artifact, EnrichedIncident, IncidentId, IncidentRecord};
