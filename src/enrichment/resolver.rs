use crate::backend::{api, unwrap_data, BackendClient, BackendError, ReturnLevel};
use crate::config::FailurePolicy;
use crate::enrichment::cancel::CancellationSignal;
use crate::enrichment::error::{EnrichmentError, EnrichmentResult, RelatedFetchError};
use crate::enrichment::executor::BoundedExecutor;
use crate::enrichment::models::SkippedRelated;
use crate::models::{IncidentId, IncidentRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimal records of related incidents
#[derive(Debug, Clone, Default)]
pub struct ResolvedIncidents {
    /// Records aligned with the ascending id order they were requested in
    pub incidents: Vec<IncidentRecord>,

    /// Ids that could not be fetched (lenient policy only)
    pub skipped: Vec<SkippedRelated>,
}

/// Fetches the minimal view of every related incident
pub struct RelatedIncidentResolver {
    client: Arc<dyn BackendClient>,
    policy: FailurePolicy,
    executor: BoundedExecutor,
}

impl RelatedIncidentResolver {
    pub fn new(client: Arc<dyn BackendClient>, policy: FailurePolicy, max_concurrent: usize) -> Self {
        Self {
            client,
            policy,
            executor: BoundedExecutor::new(max_concurrent),
        }
    }

    /// Resolve `related_ids` (ascending) in the same order
    pub async fn resolve(
        &self,
        base_id: IncidentId,
        related_ids: &[IncidentId],
        cancel: &CancellationSignal,
    ) -> EnrichmentResult<ResolvedIncidents> {
        let cancelled = |_| EnrichmentError::Cancelled {
            incident_id: base_id,
        };
        let fetch = |related_id: IncidentId| self.fetch_minimal(base_id, related_id);

        match self.policy {
            FailurePolicy::Strict => {
                let incidents = self
                    .executor
                    .try_run(related_ids.iter().copied(), fetch, cancel)
                    .await
                    .map_err(cancelled)??;
                Ok(ResolvedIncidents {
                    incidents,
                    skipped: Vec::new(),
                })
            }
            FailurePolicy::Lenient => {
                let results = self
                    .executor
                    .run(related_ids.iter().copied(), fetch, cancel)
                    .await
                    .map_err(cancelled)?;

                let mut resolved = ResolvedIncidents::default();
                for result in results {
                    match result {
                        Ok(record) => resolved.incidents.push(record),
                        Err(e) => {
                            warn!(
                                incident_id = base_id,
                                related_id = e.related_id,
                                error = %e.source,
                                "Skipping related incident that could not be fetched"
                            );
                            resolved.skipped.push(SkippedRelated {
                                incident_id: e.related_id,
                                error: e.source.to_string(),
                            });
                        }
                    }
                }
                Ok(resolved)
            }
        }
    }

    /// Fetch the minimal record of one related incident
    pub async fn fetch_minimal(
        &self,
        base_id: IncidentId,
        related_id: IncidentId,
    ) -> Result<IncidentRecord, RelatedFetchError> {
        debug!(incident_id = base_id, related_id, "Fetching related incident (minimal)");

        let error = |source| RelatedFetchError {
            incident_id: base_id,
            related_id,
            source,
        };

        let response = self
            .client
            .get(&api::incident_path(related_id, ReturnLevel::Minimal))
            .await
            .map_err(error)?;

        IncidentRecord::from_value(unwrap_data(response)).ok_or_else(|| {
            error(BackendError::Decode(format!(
                "incident {} response is not an object",
                related_id
            )))
        })
    }
}
