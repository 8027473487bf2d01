use crate::backend::client::{BackendClient, FileUpload};
use crate::backend::error::{BackendError, BackendResult};
use crate::models::IncidentId;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A request seen by the in-memory backend
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    full: HashMap<IncidentId, Value>,
    minimal: HashMap<IncidentId, Value>,
    artifacts: Vec<(IncidentId, Value)>,
    path_failures: HashMap<String, BackendError>,
    search_failures: HashMap<String, BackendError>,
    notes: Vec<(IncidentId, Value)>,
    uploads: Vec<(IncidentId, FileUpload)>,
    calls: Vec<RecordedCall>,
    latency: Option<Duration>,
    page_cap: Option<usize>,
}

/// In-memory case-management backend (for demos and testing).
///
/// Artifact search is answered from every registered artifact, so the same value
/// attached to several incidents yields one row per attachment.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an incident. The minimal view keeps `id`, `name` and `plan_status`.
    pub fn add_incident(&self, record: Value) {
        let Some(id) = record.get("id").and_then(Value::as_i64) else {
            return;
        };
        let mut minimal = Map::new();
        for key in ["id", "name", "plan_status"] {
            if let Some(value) = record.get(key) {
                minimal.insert(key.to_string(), value.clone());
            }
        }
        let mut state = self.state.write();
        state.minimal.insert(id, Value::Object(minimal));
        state.full.insert(id, record);
    }

    /// Attach an artifact to an incident; `incident_id` is stamped onto the row
    pub fn add_artifact(&self, incident_id: IncidentId, artifact: Value) {
        let mut artifact = artifact;
        if let Value::Object(map) = &mut artifact {
            map.insert("incident_id".to_string(), json!(incident_id));
        }
        self.state.write().artifacts.push((incident_id, artifact));
    }

    /// Fail every request whose path equals `path`
    pub fn fail_path(&self, path: impl Into<String>, error: BackendError) {
        self.state.write().path_failures.insert(path.into(), error);
    }

    /// Fail the cross-incident search for one artifact value
    pub fn fail_search(&self, value: impl Into<String>, error: BackendError) {
        self.state.write().search_failures.insert(value.into(), error);
    }

    /// Return at most `cap` rows per page, whatever size was requested
    pub fn cap_page_size(&self, cap: usize) {
        self.state.write().page_cap = Some(cap);
    }

    /// Delay every request by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().latency = Some(latency);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().calls.clone()
    }

    /// Number of cross-incident artifact searches issued
    pub fn search_count(&self) -> usize {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| c.path == crate::backend::api::ARTIFACT_SEARCH_PATH)
            .count()
    }

    /// Values searched for, in request order
    pub fn searched_values(&self) -> Vec<String> {
        self.state
            .read()
            .calls
            .iter()
            .filter(|c| c.path == crate::backend::api::ARTIFACT_SEARCH_PATH)
            .filter_map(|c| c.body.as_ref())
            .filter_map(|b| b["filters"][0]["value"].as_str().map(str::to_string))
            .collect()
    }

    /// Highest number of requests observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn notes(&self) -> Vec<(IncidentId, Value)> {
        self.state.read().notes.clone()
    }

    pub fn uploads(&self) -> Vec<(IncidentId, FileUpload)> {
        self.state.read().uploads.clone()
    }

    async fn enter(&self, method: &'static str, path: &str, body: Option<&Value>) -> BackendResult<()> {
        let latency = {
            let mut state = self.state.write();
            state.calls.push(RecordedCall {
                method,
                path: path.to_string(),
                body: body.cloned(),
            });
            state.latency
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.state.read().path_failures.get(path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn not_found(path: &str) -> BackendError {
        BackendError::Status {
            status: 404,
            path: path.to_string(),
            body: "not found".to_string(),
        }
    }

    fn incident_artifacts(&self, id: IncidentId) -> Vec<Value> {
        self.state
            .read()
            .artifacts
            .iter()
            .filter(|(owner, _)| *owner == id)
            .map(|(_, artifact)| artifact.clone())
            .collect()
    }

    fn paged(rows: Vec<Value>, body: &Value, cap: Option<usize>) -> Value {
        let total = rows.len();
        let start = body["start"].as_u64().unwrap_or(0) as usize;
        let size = body["size"].as_u64().map(|s| s as usize).unwrap_or(total);
        let size = cap.map_or(size, |cap| size.min(cap));
        let page: Vec<Value> = rows.into_iter().skip(start).take(size).collect();
        json!({
            "recordsTotal": total,
            "recordsFiltered": total,
            "data": page,
        })
    }
}

fn parse_incident_segment(rest: &str) -> Option<(IncidentId, &str)> {
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    let id = rest[..end].parse().ok()?;
    Some((id, &rest[end..]))
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn get(&self, path: &str) -> BackendResult<Value> {
        self.enter("GET", path, None).await?;

        let (id, tail) = path
            .strip_prefix("/incidents/")
            .and_then(parse_incident_segment)
            .ok_or_else(|| Self::not_found(path))?;

        let state = self.state.read();
        match tail {
            "?return_level=full" | "" => state.full.get(&id).cloned(),
            "?return_level=minimal" => state.minimal.get(&id).cloned(),
            "/artifacts" => {
                drop(state);
                return Ok(Value::Array(self.incident_artifacts(id)));
            }
            _ => None,
        }
        .ok_or_else(|| Self::not_found(path))
    }

    async fn post(&self, path: &str, body: &Value) -> BackendResult<Value> {
        self.enter("POST", path, Some(body)).await?;

        if path == crate::backend::api::ARTIFACT_SEARCH_PATH {
            let value = body["filters"][0]["value"].as_str().unwrap_or_default();
            let state = self.state.read();
            if let Some(error) = state.search_failures.get(value) {
                return Err(error.clone());
            }
            let rows: Vec<Value> = state
                .artifacts
                .iter()
                .filter(|(_, artifact)| artifact["value"].as_str() == Some(value))
                .map(|(_, artifact)| artifact.clone())
                .collect();
            return Ok(Self::paged(rows, body, state.page_cap));
        }

        let (id, tail) = path
            .strip_prefix("/incidents/")
            .and_then(parse_incident_segment)
            .ok_or_else(|| Self::not_found(path))?;

        match tail {
            "/artifacts/query_paged" => {
                let cap = self.state.read().page_cap;
                Ok(Self::paged(self.incident_artifacts(id), body, cap))
            }
            "/notes" => {
                let note_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let mut note = body.clone();
                if let Value::Object(map) = &mut note {
                    map.insert("id".to_string(), json!(note_id));
                    map.insert("inc_id".to_string(), json!(id));
                }
                self.state.write().notes.push((id, note.clone()));
                Ok(note)
            }
            _ => Err(Self::not_found(path)),
        }
    }

    async fn upload(&self, path: &str, file: FileUpload) -> BackendResult<Value> {
        self.enter("UPLOAD", path, None).await?;

        let (id, tail) = path
            .strip_prefix("/incidents/")
            .and_then(parse_incident_segment)
            .ok_or_else(|| Self::not_found(path))?;
        if tail != "/attachments" {
            return Err(Self::not_found(path));
        }

        let attachment_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let name = file.file_name.clone();
        self.state.write().uploads.push((id, file));
        Ok(json!({
            "attachment_id": attachment_id,
            "name": name,
            "inc_id": id,
        }))
    }

    fn resource_url(&self, path: &str) -> String {
        format!("memory://rest/orgs/0{}", path)
    }
}
