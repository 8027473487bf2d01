//! Request builders for the case-management endpoints used by enrichment and note posting.

use crate::backend::client::{unwrap_rows, BackendClient};
use crate::backend::error::BackendResult;
use crate::models::IncidentId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Response shape requested for an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnLevel {
    Full,
    Minimal,
}

impl fmt::Display for ReturnLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnLevel::Full => write!(f, "full"),
            ReturnLevel::Minimal => write!(f, "minimal"),
        }
    }
}

/// One page of a paged query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub start: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn first(size: usize) -> Self {
        Self { start: 0, size }
    }

    /// The page following this one, given how many rows this one returned
    pub fn next(self, received: usize) -> Self {
        Self {
            start: self.start + received,
            size: self.size,
        }
    }

    /// Whether a page holding `rows` results may have more after it
    pub fn is_full(&self, rows: usize) -> bool {
        self.size > 0 && rows >= self.size
    }
}

pub fn incident_path(id: IncidentId, level: ReturnLevel) -> String {
    format!("/incidents/{}?return_level={}", id, level)
}

pub fn artifacts_path(id: IncidentId) -> String {
    format!("/incidents/{}/artifacts", id)
}

pub fn artifacts_query_path(id: IncidentId) -> String {
    format!("/incidents/{}/artifacts/query_paged", id)
}

pub const ARTIFACT_SEARCH_PATH: &str = "/artifacts/query_paged";

pub fn notes_path(id: IncidentId) -> String {
    format!("/incidents/{}/notes", id)
}

pub fn attachments_path(id: IncidentId) -> String {
    format!("/incidents/{}/attachments", id)
}

pub fn attachment_data_path(id: IncidentId, attachment_id: i64) -> String {
    format!("/incidents/{}/attachments/{}/data", id, attachment_id)
}

/// Body for listing one incident's artifacts page by page
pub fn artifact_page_body(page: PageRequest) -> Value {
    json!({
        "start": page.start,
        "size": page.size,
    })
}

/// Body for the cross-incident artifact search: every artifact whose value equals `value`
pub fn artifact_search_body(value: &str, page: PageRequest) -> Value {
    json!({
        "filters": [
            {"field_name": "value", "method": "equals", "value": value}
        ],
        "start": page.start,
        "size": page.size,
    })
}

/// Rows gathered from a paged query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paged {
    pub rows: Vec<Value>,

    /// Rows were left behind when paging stopped
    pub truncated: bool,
}

/// Matching row count a paged response reports, when it reports one
fn reported_total(response: &Value) -> Option<usize> {
    ["recordsFiltered", "recordsTotal"]
        .iter()
        .find_map(|key| response.get(*key).and_then(Value::as_u64))
        .map(|total| total as usize)
}

/// POST a paged query, following pages while rows remain, up to `max_pages`.
///
/// Rows remain while the collected count is below the reported total or, when the
/// response carries no total, while pages come back full. `max_pages == 1` requests
/// the first page only.
pub async fn query_pages<F>(
    client: &dyn BackendClient,
    path: &str,
    page_size: usize,
    max_pages: usize,
    body: F,
) -> BackendResult<Paged>
where
    F: Fn(PageRequest) -> Value,
{
    let max_pages = max_pages.max(1);
    let mut page = PageRequest::first(page_size);
    let mut paged = Paged::default();

    for requested in 1..=max_pages {
        let response = client.post(path, &body(page)).await?;
        let total = reported_total(&response);
        let rows = unwrap_rows(response)?;
        let received = rows.len();
        paged.rows.extend(rows);

        let remaining = match total {
            Some(total) => paged.rows.len() < total,
            None => page.is_full(received),
        };
        if !remaining {
            break;
        }
        if received == 0 || requested == max_pages {
            paged.truncated = true;
            break;
        }
        page = page.next(received);
    }

    Ok(paged)
}

/// Body for a rich-text incident note
pub fn note_body(content: &str) -> Value {
    json!({
        "type_id": 0,
        "content": content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_paths() {
        assert_eq!(
            incident_path(100, ReturnLevel::Full),
            "/incidents/100?return_level=full"
        );
        assert_eq!(
            incident_path(7, ReturnLevel::Minimal),
            "/incidents/7?return_level=minimal"
        );
        assert_eq!(artifacts_path(100), "/incidents/100/artifacts");
        assert_eq!(
            attachment_data_path(5, 12),
            "/incidents/5/attachments/12/data"
        );
    }

    #[test]
    fn test_search_body_shape() {
        let body = artifact_search_body("1.2.3.4", PageRequest::first(100));
        assert_eq!(body["filters"][0]["field_name"], "value");
        assert_eq!(body["filters"][0]["method"], "equals");
        assert_eq!(body["filters"][0]["value"], "1.2.3.4");
        assert_eq!(body["start"], 0);
        assert_eq!(body["size"], 100);
    }

    #[tokio::test]
    async fn test_query_pages_follows_full_pages() {
        let backend = crate::backend::InMemoryBackend::new();
        for id in 1..=5 {
            backend.add_artifact(id, json!({"value": "x"}));
        }

        let single = query_pages(&backend, ARTIFACT_SEARCH_PATH, 2, 1, |page| {
            artifact_search_body("x", page)
        })
        .await
        .unwrap();
        assert_eq!(single.rows.len(), 2);
        assert!(single.truncated);

        let all = query_pages(&backend, ARTIFACT_SEARCH_PATH, 2, 10, |page| {
            artifact_search_body("x", page)
        })
        .await
        .unwrap();
        assert_eq!(all.rows.len(), 5);
        assert!(!all.truncated);
        assert_eq!(backend.search_count(), 4);
    }

    #[tokio::test]
    async fn test_query_pages_uses_reported_total() {
        let backend = crate::backend::InMemoryBackend::new();
        for id in 1..=5 {
            backend.add_artifact(id, json!({"value": "x"}));
        }
        // the backend serves 2 rows even though 3 were asked for
        backend.cap_page_size(2);

        let single = query_pages(&backend, ARTIFACT_SEARCH_PATH, 3, 1, |page| {
            artifact_search_body("x", page)
        })
        .await
        .unwrap();
        assert_eq!(single.rows.len(), 2);
        assert!(single.truncated);

        let all = query_pages(&backend, ARTIFACT_SEARCH_PATH, 3, 10, |page| {
            artifact_search_body("x", page)
        })
        .await
        .unwrap();
        let owners: Vec<_> = all
            .rows
            .iter()
            .map(|row| row["incident_id"].as_i64().unwrap())
            .collect();
        assert_eq!(owners, vec![1, 2, 3, 4, 5]);
        assert!(!all.truncated);

        let starts: Vec<_> = backend
            .calls()
            .iter()
            .skip(1)
            .map(|call| call.body.as_ref().unwrap()["start"].as_u64().unwrap())
            .collect();
        assert_eq!(starts, vec![0, 2, 4]);
    }

    #[test]
    fn test_page_progression() {
        let page = PageRequest::first(50);
        assert!(page.is_full(50));
        assert!(!page.is_full(49));
        assert_eq!(page.next(50), PageRequest { start: 50, size: 50 });
        assert_eq!(page.next(20), PageRequest { start: 20, size: 50 });
        assert!(!PageRequest::first(0).is_full(0));
    }
}
