use crate::backend::{api, unwrap_rows, BackendClient, BackendError, BackendResult};
use crate::config::{ArtifactListing, CorrelationConfig};
use crate::enrichment::error::FetchError;
use crate::models::{Artifact, IncidentId};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lists the artifacts attached to one incident.
///
/// `List` mode issues a single `GET`; `QueryPaged` mode requests pages of
/// `artifact_page_size`, up to `max_pages` (first page only by default).
pub struct ArtifactFetcher {
    client: Arc<dyn BackendClient>,
    config: Arc<CorrelationConfig>,
}

impl ArtifactFetcher {
    pub fn new(client: Arc<dyn BackendClient>, config: Arc<CorrelationConfig>) -> Self {
        Self { client, config }
    }

    /// Fetch every artifact of `incident_id`, in backend order. Not retried.
    pub async fn fetch(&self, incident_id: IncidentId) -> Result<Vec<Artifact>, FetchError> {
        let rows = self
            .fetch_rows(incident_id)
            .await
            .map_err(|source| FetchError::Artifacts {
                incident_id,
                source,
            })?;

        let artifacts = rows
            .into_iter()
            .map(serde_json::from_value::<Artifact>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FetchError::Artifacts {
                incident_id,
                source: BackendError::Decode(format!("malformed artifact: {}", e)),
            })?;

        debug!(incident_id, count = artifacts.len(), "Listed artifacts");
        Ok(artifacts)
    }

    async fn fetch_rows(&self, incident_id: IncidentId) -> BackendResult<Vec<Value>> {
        match self.config.artifact_listing {
            ArtifactListing::List => {
                let response = self.client.get(&api::artifacts_path(incident_id)).await?;
                unwrap_rows(response)
            }
            ArtifactListing::QueryPaged => {
                let paged = api::query_pages(
                    self.client.as_ref(),
                    &api::artifacts_query_path(incident_id),
                    self.config.artifact_page_size,
                    self.config.max_pages,
                    api::artifact_page_body,
                )
                .await?;

                if paged.truncated {
                    warn!(
                        incident_id,
                        count = paged.rows.len(),
                        "Artifact listing hit the page limit; remaining artifacts are not correlated"
                    );
                }
                Ok(paged.rows)
            }
        }
    }
}
