use crate::config::FailurePolicy;
use crate::correlation::SkippedQuery;
use crate::models::{EnrichedIncident, IncidentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A related incident left out under the lenient policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRelated {
    pub incident_id: IncidentId,

    /// Failure description
    pub error: String,
}

/// What one enrichment call did, alongside the enriched record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentReport {
    /// Base incident
    pub incident_id: IncidentId,

    /// Failure policy in effect
    pub policy: FailurePolicy,

    /// Artifacts attached to the base incident
    pub artifact_count: usize,

    /// Artifact values searched across incidents
    pub queried_values: usize,

    /// Related incidents resolved
    pub related_count: usize,

    /// Searches that failed and were skipped
    pub skipped_queries: Vec<SkippedQuery>,

    /// Related incidents that could not be fetched
    pub skipped_related: Vec<SkippedRelated>,

    /// Artifact values whose search hit the page limit
    pub truncated_values: Vec<String>,

    /// Enrichment timestamp
    pub enriched_at: DateTime<Utc>,

    /// Enrichment duration (milliseconds)
    pub enrichment_duration_ms: u64,
}

impl EnrichmentReport {
    /// Items left out of the result
    pub fn skipped_count(&self) -> usize {
        self.skipped_queries.len() + self.skipped_related.len()
    }

    /// Nothing was skipped or cut off by the page limit
    pub fn is_complete(&self) -> bool {
        self.skipped_count() == 0 && self.truncated_values.is_empty()
    }
}

/// Result of a successful enrichment call
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub incident: EnrichedIncident,
    pub report: EnrichmentReport,
}
