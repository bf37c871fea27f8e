//! Error types for the bunq client.

use crate::envelope::ApiErrorBody;

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum BunqError {
    /// Missing secret, handshake step attempted out of order, or invalid config.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Malformed or incomplete response from the API.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The API rejected the call.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: ApiErrorBody },

    /// Network-level failure.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Key pair could not be generated or encoded.
    #[error("key generation failed: {message}")]
    KeyGeneration { message: String },

    /// Credential store failure.
    #[error("credential store error: {message}")]
    Store { message: String },
}

impl BunqError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 1,

            // Auth issues
            Self::HttpStatus { .. } if self.is_auth_failure() => 2,
            Self::HttpStatus { .. } => 3,

            Self::Protocol { .. } => 4,
            Self::Transport { .. } => 5,

            // Local state
            Self::KeyGeneration { .. } => 6,
            Self::Store { .. } => 6,
        }
    }

    /// Whether the API rejected the credentials (expired or revoked token).
    ///
    /// Recovery is the caller's job: refresh the session, then retry.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401 | 403, .. })
    }

    /// Whether the error is retryable. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BunqError {
    fn from(err: reqwest::Error) -> Self {
        // Builder errors (bad header value, bad URL) never reached the network.
        if err.is_builder() {
            return Self::Configuration {
                message: format!("invalid request: {err}"),
            };
        }
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type BunqResult<T> = Result<T, BunqError>;
