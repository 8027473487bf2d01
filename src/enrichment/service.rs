use crate::backend::{api, unwrap_data, BackendClient, BackendError, ReturnLevel};
use crate::config::{CorrelationConfig, FailurePolicy};
use crate::correlation::CorrelationEngine;
use crate::enrichment::artifacts::ArtifactFetcher;
use crate::enrichment::cancel::CancellationSignal;
use crate::enrichment::error::{EnrichmentError, EnrichmentResult, FetchError};
use crate::enrichment::models::{EnrichmentOutcome, EnrichmentReport};
use crate::enrichment::normalizer::normalize_record;
use crate::enrichment::resolver::RelatedIncidentResolver;
use crate::models::{EnrichedIncident, IncidentId, IncidentRecord};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Enrichment service turns an incident id into the incident, its artifacts and every
/// other incident sharing an artifact value.
///
/// The backend client is injected and shared read-only by every call; no state is kept
/// between calls, so one service can enrich several incidents concurrently.
pub struct IncidentEnrichmentService {
    /// Backend client
    client: Arc<dyn BackendClient>,

    /// Configuration
    config: Arc<CorrelationConfig>,

    /// Artifact listing
    artifacts: ArtifactFetcher,

    /// Cross-incident correlation
    correlation: CorrelationEngine,

    /// Related incident lookups
    resolver: RelatedIncidentResolver,
}

impl IncidentEnrichmentService {
    /// Create a new enrichment service
    pub fn new(client: Arc<dyn BackendClient>, config: CorrelationConfig) -> Self {
        let config = Arc::new(config);

        Self {
            artifacts: ArtifactFetcher::new(Arc::clone(&client), Arc::clone(&config)),
            correlation: CorrelationEngine::new(Arc::clone(&client), Arc::clone(&config)),
            resolver: RelatedIncidentResolver::new(
                Arc::clone(&client),
                config.failure_policy,
                config.max_concurrent,
            ),
            client,
            config,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Enrich an incident
    pub async fn enrich(&self, incident_id: IncidentId) -> EnrichmentResult<EnrichmentOutcome> {
        self.enrich_with_cancel(incident_id, &CancellationSignal::never())
            .await
    }

    /// Enrich an incident, giving up with `EnrichmentError::Cancelled` once `cancel` fires
    pub async fn enrich_with_cancel(
        &self,
        incident_id: IncidentId,
        cancel: &CancellationSignal,
    ) -> EnrichmentResult<EnrichmentOutcome> {
        let start = Instant::now();

        let result = self.run(incident_id, cancel, start).await;
        match &result {
            Ok(outcome) => info!(
                incident_id,
                artifacts = outcome.report.artifact_count,
                related = outcome.report.related_count,
                skipped = outcome.report.skipped_count(),
                duration_ms = outcome.report.enrichment_duration_ms,
                "Enrichment completed"
            ),
            Err(e) if e.is_cancelled() => warn!(incident_id, "Enrichment cancelled"),
            Err(e) => error!(incident_id, error = %e, "Enrichment failed"),
        }
        result
    }

    async fn run(
        &self,
        incident_id: IncidentId,
        cancel: &CancellationSignal,
        start: Instant,
    ) -> EnrichmentResult<EnrichmentOutcome> {
        info!(incident_id, policy = %self.config.failure_policy, "Enriching incident");

        let record = guard(incident_id, cancel, self.fetch_incident(incident_id)).await??;
        let record = normalize_record(record);

        let artifacts = guard(incident_id, cancel, self.artifacts.fetch(incident_id)).await??;

        let correlation = self
            .correlation
            .correlate(incident_id, &artifacts, cancel)
            .await?;
        let queried_values = correlation.queried_values;
        let skipped_queries = correlation.skipped;
        let truncated_values = correlation.truncated_values;
        let related_ids = correlation.related.into_sorted();

        debug!(incident_id, related_ids = ?related_ids, "Resolving related incidents");
        let resolved = self
            .resolver
            .resolve(incident_id, &related_ids, cancel)
            .await?;

        let report = EnrichmentReport {
            incident_id,
            policy: self.config.failure_policy,
            artifact_count: artifacts.len(),
            queried_values,
            related_count: resolved.incidents.len(),
            skipped_queries,
            skipped_related: resolved.skipped,
            truncated_values,
            enriched_at: Utc::now(),
            enrichment_duration_ms: start.elapsed().as_millis() as u64,
        };

        Ok(EnrichmentOutcome {
            incident: EnrichedIncident {
                record,
                artifacts,
                related_incidents: resolved.incidents,
            },
            report,
        })
    }

    /// Fetch the full record of an incident, without normalization
    pub async fn fetch_incident(&self, incident_id: IncidentId) -> Result<IncidentRecord, FetchError> {
        debug!(incident_id, "Fetching incident (full)");

        let response = self
            .client
            .get(&api::incident_path(incident_id, ReturnLevel::Full))
            .await
            .map_err(|source| FetchError::Incident {
                incident_id,
                source,
            })?;

        IncidentRecord::from_value(unwrap_data(response)).ok_or_else(|| FetchError::Incident {
            incident_id,
            source: BackendError::Decode(format!(
                "incident {} response is not an object",
                incident_id
            )),
        })
    }
}

/// Race a fetch against cancellation
async fn guard<F, T>(
    incident_id: IncidentId,
    cancel: &CancellationSignal,
    work: F,
) -> EnrichmentResult<Result<T, FetchError>>
where
    F: Future<Output = Result<T, FetchError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EnrichmentError::Cancelled { incident_id }),
        result = work => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::enrichment::cancel::CancellationToken;
    use serde_json::json;
    use std::time::Duration;

    fn scenario_backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.add_incident(json!({
            "id": 100,
            "name": "Suspicious login",
            "plan_status": "A",
            "properties": {"additional_information": "VPN gateway"}
        }));
        backend.add_incident(json!({"id": 200, "name": "Beacon", "plan_status": "A"}));
        backend.add_incident(json!({"id": 305, "name": "Brute force", "plan_status": "C"}));

        backend.add_artifact(100, json!({"id": 1, "value": "1.2.3.4"}));
        backend.add_artifact(100, json!({"id": 2, "value": ""}));
        backend.add_artifact(200, json!({"id": 3, "value": "1.2.3.4"}));
        backend.add_artifact(200, json!({"id": 4, "value": "1.2.3.4"}));
        backend.add_artifact(305, json!({"id": 5, "value": "1.2.3.4"}));
        backend
    }

    fn service(backend: &InMemoryBackend) -> IncidentEnrichmentService {
        IncidentEnrichmentService::new(Arc::new(backend.clone()), CorrelationConfig::default())
    }

    #[tokio::test]
    async fn test_enrich_incident() {
        let backend = scenario_backend();
        let outcome = service(&backend).enrich(100).await.unwrap();

        let incident = &outcome.incident;
        assert_eq!(incident.id(), Some(100));
        assert_eq!(incident.record.description(), Some(""));
        assert_eq!(
            incident.record.additional_information(),
            Some(&json!("VPN gateway"))
        );
        assert_eq!(incident.artifacts.len(), 2);
        assert_eq!(incident.related_ids(), vec![200, 305]);

        assert_eq!(backend.searched_values(), vec!["1.2.3.4".to_string()]);
        assert!(outcome.report.is_complete());
        assert_eq!(outcome.report.queried_values, 1);
    }

    #[tokio::test]
    async fn test_missing_incident_is_fatal() {
        let backend = scenario_backend();
        let err = service(&backend).enrich(999).await.unwrap_err();

        assert_eq!(err.incident_id(), 999);
        assert!(matches!(err, EnrichmentError::Fetch(FetchError::Incident { .. })));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let backend = scenario_backend();
        let token = CancellationToken::new();
        token.cancel();

        let err = service(&backend)
            .enrich_with_cancel(100, &token.signal())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_fetch() {
        let backend = scenario_backend();
        backend.set_latency(Duration::from_secs(10));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            service(&backend).enrich_with_cancel(100, &token.signal()),
        )
        .await
        .expect("cancellation should end the call")
        .unwrap_err();

        assert_eq!(err.incident_id(), 100);
        assert!(err.is_cancelled());
    }
}
