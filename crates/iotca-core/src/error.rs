use thiserror::Error;

/// Result type alias for PKI engine operations
pub type Result<T> = std::result::Result<T, PkiError>;

/// Errors that can occur when talking to the PKI secrets engine
#[derive(Error, Debug)]
pub enum PkiError {
    /// Authentication failed - invalid, expired or missing bearer token
    #[error("authentication failed: token rejected by the PKI engine")]
    Unauthorized,

    /// Resource not found (unknown mount, role or issuer)
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the resource that wasn't found
        resource: String,
    },

    /// Engine returned an error response
    #[error("engine error ({code}): {}", messages.join("; "))]
    Api {
        /// HTTP status code
        code: u16,
        /// Error messages from the engine's `errors` array
        messages: Vec<String>,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Connection failed (engine unreachable)
    #[error("connection failed: {0}")]
    Connection(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A successful response was missing a required field
    #[error("engine response is missing `{field}`")]
    MissingField {
        /// Name of the absent field
        field: &'static str,
    },

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl PkiError {
    /// Returns true if the error is due to authentication
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns the HTTP status code if this is an engine error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
