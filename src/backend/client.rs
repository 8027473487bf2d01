use crate::backend::error::BackendResult;
use async_trait::async_trait;
use serde_json::Value;

/// A file sent to the backend as a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Multipart field name
    pub field: String,

    /// File name reported to the backend
    pub file_name: String,

    /// MIME type of the content
    pub mime_type: String,

    /// Raw file content
    pub content: Vec<u8>,
}

/// Authenticated access to the case-management REST API.
///
/// Paths are relative to the organization root (for example `/incidents/42`).
/// Implementations are shared read-only across every call of one enrichment run,
/// so they must be safe to use from concurrent tasks.
#[async_trait]
pub trait BackendClient: Send + Sync + 'static {
    /// Issue a `GET` and return the parsed JSON body
    async fn get(&self, path: &str) -> BackendResult<Value>;

    /// Issue a `POST` with a JSON body and return the parsed JSON body
    async fn post(&self, path: &str, body: &Value) -> BackendResult<Value>;

    /// Upload a file as `multipart/form-data` and return the parsed JSON body
    async fn upload(&self, path: &str, file: FileUpload) -> BackendResult<Value>;

    /// Absolute URL for a path, used when a link to a backend resource is embedded in content
    fn resource_url(&self, path: &str) -> String;
}

/// Unwrap the `data` envelope of a response.
///
/// A response without a `data` key is the payload itself.
pub fn unwrap_data(response: Value) -> Value {
    match response {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Unwrap the `data` envelope and require a list of rows.
///
/// `null` is read as an empty list.
pub fn unwrap_rows(response: Value) -> BackendResult<Vec<Value>> {
    match unwrap_data(response) {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Err(crate::backend::BackendError::Decode(format!(
            "expected a list of rows, got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
