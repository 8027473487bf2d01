use crate::backend::BackendError;
use crate::enrichment::EnrichmentError;
use crate::notes::NoteError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend client errors outside of an enrichment run
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Enrichment failures (fatal fetches, strict-policy sub-query failures, cancellation)
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    /// Note posting errors
    #[error(transparent)]
    Note(#[from] NoteError),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Backend(_) => "BACKEND_ERROR",
            AppError::Enrichment(EnrichmentError::Cancelled { .. }) => "CANCELLED",
            AppError::Enrichment(_) => "ENRICHMENT_ERROR",
            AppError::Note(_) => "NOTE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Configuration(_) | AppError::Validation(_) => 2,
            AppError::Enrichment(EnrichmentError::Cancelled { .. }) => 130,
            _ => 1,
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::FetchError;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::Configuration("test".to_string()).error_code(),
            "CONFIGURATION_ERROR"
        );
        assert_eq!(
            AppError::Validation("test".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::Enrichment(EnrichmentError::Cancelled { incident_id: 7 }).error_code(),
            "CANCELLED"
        );
    }

    #[test]
    fn test_enrichment_error_keeps_incident_context() {
        let err: AppError = EnrichmentError::Fetch(FetchError::Artifacts {
            incident_id: 100,
            source: BackendError::Transport("connection refused".to_string()),
        })
        .into();

        assert_eq!(err.error_code(), "ENRICHMENT_ERROR");
        assert_eq!(err.exit_code(), 1);
        let message = err.to_string();
        assert!(message.contains("100"), "{message}");
        assert!(message.contains("connection refused"), "{message}");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Configuration("x".into()).exit_code(), 2);
        assert_eq!(
            AppError::Enrichment(EnrichmentError::Cancelled { incident_id: 1 }).exit_code(),
            130
        );
    }
}
