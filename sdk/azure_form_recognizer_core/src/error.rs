use thiserror::Error;

/// Errors that can occur when interacting with the Azure Form Recognizer API.
#[derive(Error, Debug)]
pub enum FormRecognizerError {
    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Reading from a document stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// The API returned an error response.
    #[error("API error ({code}): {message}")]
    Api { code: String, message: String },

    /// A request builder was given invalid or incomplete input.
    #[error("Invalid request: {0}")]
    Builder(String),

    /// The operation is not valid for the given input, e.g. sniffing a
    /// stream that cannot seek.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An element reference such as `#/readResults/0/lines/1` is malformed.
    #[error("Invalid element reference: {0}")]
    InvalidReference(String),

    /// Waiting on a long-running operation was cancelled by the caller.
    #[error("Operation was cancelled")]
    Cancelled,
}

impl FormRecognizerError {
    /// Create a [`FormRecognizerError::Http`] error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a [`FormRecognizerError::InvalidEndpoint`] error without an underlying cause.
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: None,
        }
    }

    /// Create a [`FormRecognizerError::InvalidEndpoint`] error wrapping a URL parse failure.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns `true` if this error represents a cancelled wait.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for Form Recognizer operations.
pub type FormRecognizerResult<T> = std::result::Result<T, FormRecognizerError>;
