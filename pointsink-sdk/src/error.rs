//! Error types for the SDK.

use thiserror::Error;

use pointsink_types::EncodeError;

/// Errors that can occur while connecting, provisioning, or sending points.
#[derive(Debug, Error)]
pub enum SinkError {
    /// A required configuration value is missing or empty.
    #[error("required environment variable {var} is not set")]
    Config {
        /// The name of the missing variable.
        var: &'static str,
    },

    /// The endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connectivity(String),

    /// The endpoint is reachable but reported itself unhealthy.
    #[error("health check failed: {0}")]
    Unhealthy(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API rejected a request.
    #[error("API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The organization or bucket could not be ensured.
    #[error("provisioning failed: {0}")]
    Provision(String),

    /// A point could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A write body could not be compressed.
    #[error("failed to compress write body: {0}")]
    Compress(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Timeout waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// The sink was already closed when the send was dispatched.
    #[error("sink is closed")]
    Closed,

    /// The background send task was cancelled or panicked.
    #[error("send task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SinkError::Timeout
        } else if err.is_connect() {
            SinkError::Connectivity(err.to_string())
        } else {
            SinkError::Http(err.to_string())
        }
    }
}
