use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection configuration
    pub backend: BackendConfig,

    /// Correlation configuration
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Legacy flat environment variables, applied over every other source
const LEGACY_ENV: [(&str, &str); 4] = [
    ("SOAR_BASE_URL", "backend.base_url"),
    ("SOAR_ORG", "backend.org_name"),
    ("SOAR_API_KEY_ID", "backend.api_key_id"),
    ("SOAR_API_KEY_SECRET", "backend.api_key_secret"),
];

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SOAR_CONFIG_PATH").unwrap_or_else(|_| "config/soar.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration using an explicit config file path (the file is optional)
    pub fn load_from(config_path: &str) -> std::result::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: SOAR__)
            .add_source(
                config::Environment::with_prefix("SOAR")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        if let Ok(verify) = std::env::var("SOAR_VERIFY") {
            let (verify_tls, ca_bundle) = parse_verify(&verify);
            builder = builder
                .set_override("backend.verify_tls", verify_tls)?
                .set_override_option("backend.ca_bundle", ca_bundle)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Parse a TOML document layered over the built-in defaults
    pub fn from_toml_str(toml: &str) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(AppError::Validation(
                "backend.base_url is not set (SOAR_BASE_URL)".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Validation(format!(
                "backend.base_url must be an http(s) URL, got {}",
                url
            )));
        }
        if self.backend.api_key_id.is_some() != self.backend.api_key_secret.is_some() {
            return Err(AppError::Validation(
                "backend.api_key_id and backend.api_key_secret must be set together".to_string(),
            ));
        }
        self.correlation.validate()
    }
}

/// Interpret `SOAR_VERIFY`: a boolean word, or the path of a CA bundle to trust
fn parse_verify(raw: &str) -> (bool, Option<String>) {
    match raw.trim().to_ascii_lowercase().as_str() {
        "false" | "0" | "no" => (false, None),
        "true" | "1" | "yes" | "" => (true, None),
        _ => (true, Some(raw.trim().to_string())),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend root URL, e.g. `https://soar.example.com`
    #[serde(default)]
    pub base_url: String,

    /// Organization name, resolved to an id at connect time
    pub org_name: Option<String>,

    /// Organization id; skips the name lookup when set
    pub org_id: Option<i64>,

    /// API key id
    pub api_key_id: Option<String>,

    /// API key secret
    pub api_key_secret: Option<String>,

    /// Verify the backend TLS certificate
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Additional CA bundle (PEM) to trust
    pub ca_bundle: Option<PathBuf>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

/// What happens when a single correlation query or related-incident fetch fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole enrichment
    Strict,
    /// Log, skip the item and report it
    #[default]
    Lenient,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Strict => write!(f, "strict"),
            FailurePolicy::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(FailurePolicy::Strict),
            "lenient" => Ok(FailurePolicy::Lenient),
            other => Err(format!("unknown failure policy '{}' (strict|lenient)", other)),
        }
    }
}

/// How a base incident's artifacts are listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactListing {
    /// `GET /incidents/{id}/artifacts`
    #[default]
    List,
    /// `POST /incidents/{id}/artifacts/query_paged`
    QueryPaged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Failure policy for correlation queries and related-incident fetches
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Maximum backend requests in flight during fan-out
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Artifact listing endpoint
    #[serde(default)]
    pub artifact_listing: ArtifactListing,

    /// Page size for artifact listing (query_paged only)
    #[serde(default = "default_artifact_page_size")]
    pub artifact_page_size: usize,

    /// Page size for the cross-incident artifact search
    #[serde(default = "default_search_page_size")]
    pub search_page_size: usize,

    /// Pages requested per paged query; 1 keeps the first page only
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            max_concurrent: default_max_concurrent(),
            artifact_listing: ArtifactListing::default(),
            artifact_page_size: default_artifact_page_size(),
            search_page_size: default_search_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(AppError::Validation(
                "correlation.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.artifact_page_size == 0 || self.search_page_size == 0 {
            return Err(AppError::Validation(
                "correlation page sizes must be at least 1".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(AppError::Validation(
                "correlation.max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

fn default_artifact_page_size() -> usize {
    1000
}

fn default_search_page_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.correlation.failure_policy, FailurePolicy::Lenient);
        assert_eq!(config.correlation.max_concurrent, 4);
        assert_eq!(config.correlation.search_page_size, 100);
        assert_eq!(config.correlation.max_pages, 1);
        assert_eq!(config.correlation.artifact_listing, ArtifactListing::List);
        assert!(config.backend.verify_tls);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_file_overrides() {
        let config = Config::from_toml_str(
            r#"
            [backend]
            base_url = "https://soar.example.com"
            org_name = "Acme"
            verify_tls = false

            [correlation]
            failure_policy = "strict"
            artifact_listing = "query_paged"
            max_concurrent = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.org_name.as_deref(), Some("Acme"));
        assert!(!config.backend.verify_tls);
        assert_eq!(config.correlation.failure_policy, FailurePolicy::Strict);
        assert_eq!(config.correlation.artifact_listing, ArtifactListing::QueryPaged);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let config = Config::from_toml_str("").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        let config = Config::from_toml_str(
            "[backend]\nbase_url = \"https://soar\"\n[correlation]\nmax_concurrent = 0\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_toml_str(
            "[backend]\nbase_url = \"https://soar\"\napi_key_id = \"id\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_verify() {
        assert_eq!(parse_verify("False"), (false, None));
        assert_eq!(parse_verify("0"), (false, None));
        assert_eq!(parse_verify("True"), (true, None));
        assert_eq!(
            parse_verify("/etc/ssl/soar.pem"),
            (true, Some("/etc/ssl/soar.pem".to_string()))
        );
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("STRICT".parse::<FailurePolicy>().unwrap(), FailurePolicy::Strict);
        assert_eq!("lenient".parse::<FailurePolicy>().unwrap(), FailurePolicy::Lenient);
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }
}
