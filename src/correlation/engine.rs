use crate::backend::{api, BackendClient};
use crate::config::{CorrelationConfig, FailurePolicy};
use crate::correlation::models::{CorrelationOutcome, RelatedIncidentSet, SkippedQuery};
use crate::enrichment::cancel::CancellationSignal;
use crate::enrichment::error::{CorrelationQueryError, EnrichmentError, EnrichmentResult};
use crate::enrichment::executor::BoundedExecutor;
use crate::models::{Artifact, IncidentId};
use futures::FutureExt;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Incidents found for one artifact value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMatches {
    pub value: String,

    /// Owning incident of every matching row, duplicates included
    pub incident_ids: Vec<IncidentId>,

    /// The search hit the page limit
    pub truncated: bool,
}

/// Finds other incidents that share an artifact value with a base incident.
///
/// One cross-incident search is issued per artifact with a non-empty value, with at
/// most `max_concurrent` searches in flight.
pub struct CorrelationEngine {
    client: Arc<dyn BackendClient>,
    config: Arc<CorrelationConfig>,
    executor: BoundedExecutor,
}

impl CorrelationEngine {
    pub fn new(client: Arc<dyn BackendClient>, config: Arc<CorrelationConfig>) -> Self {
        let executor = BoundedExecutor::new(config.max_concurrent);
        Self {
            client,
            config,
            executor,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    /// Correlate every artifact of `base_id`.
    ///
    /// Under the strict policy the first failed search aborts correlation; under the
    /// lenient policy it is logged, recorded in `skipped` and treated as "no matches".
    pub async fn correlate(
        &self,
        base_id: IncidentId,
        artifacts: &[Artifact],
        cancel: &CancellationSignal,
    ) -> EnrichmentResult<CorrelationOutcome> {
        let keys: Vec<Cow<'_, str>> = artifacts
            .iter()
            .filter_map(Artifact::correlation_key)
            .collect();
        let values: Vec<&str> = keys.iter().map(|key| &**key).collect();

        let mut outcome = CorrelationOutcome {
            related: RelatedIncidentSet::new(base_id),
            queried_values: values.len(),
            skipped: Vec::new(),
            truncated_values: Vec::new(),
        };

        if values.is_empty() {
            debug!(
                incident_id = base_id,
                artifacts = artifacts.len(),
                "No correlatable artifact values"
            );
            return Ok(outcome);
        }

        info!(
            incident_id = base_id,
            values = values.len(),
            skipped_empty = artifacts.len() - values.len(),
            max_concurrent = self.executor.max_concurrent(),
            policy = %self.config.failure_policy,
            "Correlating artifact values across incidents"
        );

        let cancelled = |_| EnrichmentError::Cancelled {
            incident_id: base_id,
        };

        match self.config.failure_policy {
            FailurePolicy::Strict => {
                let all_matches = self
                    .executor
                    .try_run(values, |value| self.query_value(base_id, value), cancel)
                    .boxed()
                    .await
                    .map_err(cancelled)??;

                for matches in all_matches {
                    absorb(&mut outcome, matches);
                }
            }
            FailurePolicy::Lenient => {
                let results = self
                    .executor
                    .run(values, |value| self.query_value(base_id, value), cancel)
                    .boxed()
                    .await
                    .map_err(cancelled)?;

                for result in results {
                    match result {
                        Ok(matches) => absorb(&mut outcome, matches),
                        Err(e) => {
                            warn!(
                                incident_id = base_id,
                                artifact_value = %e.value,
                                error = %e.source,
                                "Correlation query failed; treating value as unmatched"
                            );
                            outcome.skipped.push(SkippedQuery {
                                value: e.value,
                                error: e.source.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            incident_id = base_id,
            related = outcome.related.len(),
            skipped = outcome.skipped.len(),
            "Correlation completed"
        );

        Ok(outcome)
    }

    /// Search every artifact bearing `value` and collect the owning incidents
    pub async fn query_value(
        &self,
        base_id: IncidentId,
        value: &str,
    ) -> Result<ValueMatches, CorrelationQueryError> {
        debug!(incident_id = base_id, artifact_value = %value, "Searching artifact value");

        let paged = api::query_pages(
            self.client.as_ref(),
            api::ARTIFACT_SEARCH_PATH,
            self.config.search_page_size,
            self.config.max_pages,
            |page| api::artifact_search_body(value, page),
        )
        .await
        .map_err(|source| CorrelationQueryError {
            incident_id: base_id,
            value: value.to_string(),
            source,
        })?;

        Ok(ValueMatches {
            value: value.to_string(),
            incident_ids: paged.rows.iter().filter_map(row_incident_id).collect(),
            truncated: paged.truncated,
        })
    }
}

fn absorb(outcome: &mut CorrelationOutcome, matches: ValueMatches) {
    if matches.truncated {
        warn!(
            incident_id = outcome.related.base_id(),
            artifact_value = %matches.value,
            "Artifact search hit the page limit; related incidents may be missing"
        );
        outcome.truncated_values.push(matches.value);
    }
    outcome.related.extend(matches.incident_ids);
}

/// Owning incident of a search row (`incident_id`, or `inc_id` on some backends)
fn row_incident_id(row: &Value) -> Option<IncidentId> {
    row.get("incident_id")
        .or_else(|| row.get("inc_id"))
        .and_then(Value::as_i64)
}
