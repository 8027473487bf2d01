//! Error types for backend client operations

/// Result type for backend client operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while talking to the case-management backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection, DNS, TLS or other transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status} from {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    /// The response body could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request did not complete within the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Credentials were rejected
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The configured organization is not visible to the API key
    #[error("Organization not found: {0}")]
    OrgNotFound(String),

    /// Client could not be constructed from the supplied settings
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Whether the failure came from an HTTP status the backend returned
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout(e.to_string())
        } else if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else if e.is_status() {
            match e.status() {
                Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                    BackendError::Authentication(format!("HTTP {}", status))
                }
                Some(status) => BackendError::Status {
                    status: status.as_u16(),
                    path: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                    body: String::new(),
                },
                None => BackendError::Transport(e.to_string()),
            }
        } else if e.is_builder() {
            BackendError::Configuration(e.to_string())
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessors() {
        let err = BackendError::Status {
            status: 404,
            path: "/incidents/9".to_string(),
            body: "missing".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/incidents/9"));

        assert_eq!(BackendError::Transport("reset".into()).status(), None);
    }
}
