//! Error types for incident enrichment

use crate::backend::BackendError;
use crate::models::IncidentId;

/// Result type for enrichment operations
pub type EnrichmentResult<T> = std::result::Result<T, EnrichmentError>;

/// The base incident or its artifact listing could not be fetched. Always fatal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch incident {incident_id}: {source}")]
    Incident {
        incident_id: IncidentId,
        source: BackendError,
    },

    #[error("failed to list artifacts of incident {incident_id}: {source}")]
    Artifacts {
        incident_id: IncidentId,
        source: BackendError,
    },
}

impl FetchError {
    pub fn incident_id(&self) -> IncidentId {
        match self {
            FetchError::Incident { incident_id, .. } | FetchError::Artifacts { incident_id, .. } => {
                *incident_id
            }
        }
    }
}

/// One cross-incident artifact search failed
#[derive(Debug, Clone, thiserror::Error)]
#[error("correlation query for value '{value}' of incident {incident_id} failed: {source}")]
pub struct CorrelationQueryError {
    pub incident_id: IncidentId,
    pub value: String,
    pub source: BackendError,
}

/// The minimal record of one related incident could not be fetched
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to fetch related incident {related_id} of incident {incident_id}: {source}")]
pub struct RelatedFetchError {
    pub incident_id: IncidentId,
    pub related_id: IncidentId,
    pub source: BackendError,
}

/// A whole enrichment call failed; no partial record is produced
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment of incident {} failed: {0}", .0.incident_id())]
    Fetch(#[from] FetchError),

    #[error("enrichment of incident {} failed: {0}", .0.incident_id)]
    CorrelationQuery(#[from] CorrelationQueryError),

    #[error("enrichment of incident {} failed: {0}", .0.incident_id)]
    RelatedFetch(#[from] RelatedFetchError),

    #[error("enrichment of incident {incident_id} was cancelled")]
    Cancelled { incident_id: IncidentId },
}

impl EnrichmentError {
    /// The base incident being enriched
    pub fn incident_id(&self) -> IncidentId {
        match self {
            EnrichmentError::Fetch(e) => e.incident_id(),
            EnrichmentError::CorrelationQuery(e) => e.incident_id,
            EnrichmentError::RelatedFetch(e) => e.incident_id,
            EnrichmentError::Cancelled { incident_id } => *incident_id,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EnrichmentError::Cancelled { .. })
    }

    /// The backend failure underneath, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            EnrichmentError::Fetch(FetchError::Incident { source, .. })
            | EnrichmentError::Fetch(FetchError::Artifacts { source, .. })
            | EnrichmentError::CorrelationQuery(CorrelationQueryError { source, .. })
            | EnrichmentError::RelatedFetch(RelatedFetchError { source, .. }) => Some(source),
            EnrichmentError::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_fetch_error_message_and_source() {
        let err = EnrichmentError::from(FetchError::Artifacts {
            incident_id: 100,
            source: BackendError::Timeout("30s".to_string()),
        });

        assert_eq!(err.incident_id(), 100);
        assert_eq!(
            err.to_string(),
            "enrichment of incident 100 failed: failed to list artifacts of incident 100: Request timed out: 30s"
        );
        assert!(err.source().is_some());
        assert_eq!(
            err.backend_error(),
            Some(&BackendError::Timeout("30s".to_string()))
        );
    }

    #[test]
    fn test_query_error_names_value() {
        let err = EnrichmentError::from(CorrelationQueryError {
            incident_id: 7,
            value: "evil.example".to_string(),
            source: BackendError::Transport("reset".to_string()),
        });

        assert_eq!(err.incident_id(), 7);
        assert!(err.to_string().contains("evil.example"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled() {
        let err = EnrichmentError::Cancelled { incident_id: 3 };
        assert!(err.is_cancelled());
        assert!(err.backend_error().is_none());
        assert_eq!(err.to_string(), "enrichment of incident 3 was cancelled");
    }
}
