use crate::backend::client::{BackendClient, FileUpload};
use crate::backend::error::{BackendError, BackendResult};
use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest slice of an error body kept in a `BackendError::Status`
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
struct ApiKey {
    id: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    orgs: Vec<SessionOrg>,
}

#[derive(Debug, Deserialize)]
struct SessionOrg {
    id: i64,
    name: String,
}

/// REST client for a SOAR case-management backend.
///
/// Built once per process and handed to the enrichment service; every request is
/// authenticated with the configured API key and scoped to one organization.
#[derive(Clone)]
pub struct SoarClient {
    pub(crate) client: Client,
    base_url: String,
    org_id: i64,
    api_key: Option<ApiKey>,
}

impl SoarClient {
    /// Build the HTTP client and resolve the organization.
    ///
    /// When `org_id` is not configured it is looked up by `org_name` through the
    /// session endpoint.
    pub async fn connect(config: &BackendConfig) -> BackendResult<Self> {
        let client = Self::build_http_client(config)?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let api_key = match (&config.api_key_id, &config.api_key_secret) {
            (Some(id), Some(secret)) => Some(ApiKey {
                id: id.clone(),
                secret: secret.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(BackendError::Configuration(
                    "api_key_id and api_key_secret must be set together".to_string(),
                ))
            }
        };

        let mut soar = Self {
            client,
            base_url,
            org_id: 0,
            api_key,
        };

        soar.org_id = match config.org_id {
            Some(id) => id,
            None => soar.resolve_org_id(config.org_name.as_deref()).await?,
        };

        info!(
            base_url = %soar.base_url,
            org_id = soar.org_id,
            verify_tls = config.verify_tls,
            "Connected to SOAR backend"
        );

        Ok(soar)
    }

    fn build_http_client(config: &BackendConfig) -> BackendResult<Client> {
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for the SOAR backend");
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls);

        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path).map_err(|e| {
                BackendError::Configuration(format!(
                    "Failed to read CA bundle {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| BackendError::Configuration(format!("Invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        builder
            .build()
            .map_err(|e| BackendError::Configuration(format!("Failed to create HTTP client: {}", e)))
    }

    /// Organization the client is scoped to
    pub fn org_id(&self) -> i64 {
        self.org_id
    }

    fn org_url(&self) -> String {
        format!("{}/rest/orgs/{}", self.base_url, self.org_id)
    }

    async fn resolve_org_id(&self, org_name: Option<&str>) -> BackendResult<i64> {
        let url = format!("{}/rest/session", self.base_url);
        let body = self
            .send(self.authorize(self.client.get(&url)), "/rest/session")
            .await?;
        let session: SessionResponse = serde_json::from_value(body)?;

        match org_name {
            Some(name) => session
                .orgs
                .iter()
                .find(|org| org.name == name)
                .map(|org| org.id)
                .ok_or_else(|| BackendError::OrgNotFound(name.to_string())),
            None => match session.orgs.as_slice() {
                [only] => Ok(only.id),
                [] => Err(BackendError::OrgNotFound(
                    "API key has no organizations".to_string(),
                )),
                _ => Err(BackendError::OrgNotFound(
                    "API key sees several organizations; set org_name or org_id".to_string(),
                )),
            },
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.basic_auth(&key.id, Some(&key.secret)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> BackendResult<Value> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::Authentication(format!(
                "HTTP {} from {}",
                status.as_u16(),
                path
            )));
        }

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(BackendError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl BackendClient for SoarClient {
    async fn get(&self, path: &str) -> BackendResult<Value> {
        debug!(path = %path, "GET");
        let request = self.authorize(self.client.get(self.resource_url(path)));
        self.send(request, path).await
    }

    async fn post(&self, path: &str, body: &Value) -> BackendResult<Value> {
        debug!(path = %path, "POST");
        let request = self.authorize(self.client.post(self.resource_url(path)).json(body));
        self.send(request, path).await
    }

    async fn upload(&self, path: &str, file: FileUpload) -> BackendResult<Value> {
        debug!(path = %path, file_name = %file.file_name, bytes = file.content.len(), "POST multipart");
        let part = reqwest::multipart::Part::bytes(file.content)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| BackendError::Configuration(format!("Invalid MIME type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part(file.field, part);
        let request = self.authorize(self.client.post(self.resource_url(path)).multipart(form));
        self.send(request, path).await
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}{}", self.org_url(), path)
    }
}
