//! Error types for the console client

use std::fmt;
use thiserror::Error;

/// Rejection returned by the backend for a request it received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            request_id,
        }
    }

    /// Synthetic 401 surfaced when no fresh access token could be obtained
    pub fn token_expired() -> Self {
        Self::new(401, "token expired", None)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code == 401
    }

    /// Message suitable for display, annotated with the request id when one is known
    pub fn display_message(&self) -> String {
        match self.request_id.as_deref().map(str::trim) {
            Some(request_id) if !request_id.is_empty() => {
                format!("{} (request_id: {request_id})", self.message)
            }
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {})", self.message, self.status_code)
    }
}

impl std::error::Error for ApiError {}

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// No response was obtained from the backend
    #[error("cannot reach backend: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api(ApiError::new(status_code, message, None))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Backend rejections and unreachable-backend failures.
    ///
    /// Refresh and logout recover from these locally; everything else propagates.
    pub fn is_api_or_network(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Network(_))
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
