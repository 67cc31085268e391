use thiserror::Error;

/// Main error type for Helix API operations
#[derive(Debug, Error)]
pub enum HelixError {
    /// Non-2xx response from the API. The raw body is kept for diagnostics.
    #[error("request {route} failed with status {status}: {body}")]
    Http {
        status: u16,
        route: String,
        body: String,
    },

    /// A page payload was missing its item list
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Structured JSON was expected but text came back
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Invalid client or webhook configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl HelixError {
    /// Create a new HTTP error
    pub fn http(status: u16, route: impl Into<String>, body: impl Into<String>) -> Self {
        HelixError::Http {
            status,
            route: route.into(),
            body: body.into(),
        }
    }

    /// Check if this error is an unauthorized error (401)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, HelixError::Http { status: 401, .. })
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, HelixError::Http { status: 404, .. })
    }

    /// Get the HTTP status code if this is an HTTP error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HelixError::Http { status, .. } => Some(*status),
            HelixError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Helix operations
pub type Result<T> = std::result::Result<T, HelixError>;
