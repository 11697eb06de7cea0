use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Message used when an upstream failure carries no text of its own.
pub const DEFAULT_UPSTREAM_MESSAGE: &str = "Gemini request failed";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    ConfigError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("No image in response")]
    NoImage,
    #[error("{0}")]
    Upstream(UpstreamError),
    /// A provider result that could not be rendered as a reply.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Transport failure seen by the client adapter.
    #[error("{0}")]
    RequestError(String),
    /// Error message reported by the proxy endpoint.
    #[error("{0}")]
    Remote(String),
}

impl ProxyError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProxyError::ValidationError(message.into())
    }

    pub fn upstream(failure: &dyn UpstreamFailure) -> Self {
        ProxyError::Upstream(UpstreamError::from_failure(failure))
    }

    /// HTTP status the dispatcher answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ProxyError::ValidationError(_) => 400,
            ProxyError::MethodNotAllowed => 405,
            ProxyError::ConfigError(_) => 500,
            ProxyError::NoImage | ProxyError::Upstream(_) => 502,
            ProxyError::SerializationError(_) => 502,
            ProxyError::RequestError(_) | ProxyError::Remote(_) => 502,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, ProxyError::Upstream(_))
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Anything the provider side can fail with, reduced to the three facts the
/// proxy reports.
pub trait UpstreamFailure {
    fn message(&self) -> String;

    fn status(&self) -> Option<u16> {
        None
    }

    fn status_message(&self) -> Option<String> {
        None
    }
}

impl UpstreamFailure for reqwest::Error {
    fn message(&self) -> String {
        self.to_string()
    }

    fn status(&self) -> Option<u16> {
        reqwest::Error::status(self).map(|s| s.as_u16())
    }
}

impl UpstreamFailure for serde_json::Error {
    fn message(&self) -> String {
        format!("Malformed provider response: {}", self)
    }
}

/// Google's error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorEnvelope {
    pub error: GoogleApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpstreamFailure for GoogleApiError {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn status(&self) -> Option<u16> {
        self.code
    }

    fn status_message(&self) -> Option<String> {
        self.status.clone().filter(|s| !s.is_empty())
    }
}

/// Provider failure captured at the point it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub message: String,
    pub status: Option<u16>,
    pub status_message: Option<String>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            status_message: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_message(mut self, status_message: impl Into<String>) -> Self {
        self.status_message = Some(status_message.into());
        self
    }

    pub fn from_failure(failure: &dyn UpstreamFailure) -> Self {
        Self {
            message: failure.message(),
            status: failure.status(),
            status_message: failure.status_message(),
        }
    }
}

impl UpstreamFailure for UpstreamError {
    fn message(&self) -> String {
        self.message.clone()
    }

    fn status(&self) -> Option<u16> {
        self.status
    }

    fn status_message(&self) -> Option<String> {
        self.status_message.clone()
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&NormalizedFailure::from_upstream(self).message)
    }
}

/// `{httpStatus, message}` pair an upstream failure is reported as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFailure {
    pub http_status: u16,
    pub message: String,
}

impl NormalizedFailure {
    pub fn from_upstream(failure: &dyn UpstreamFailure) -> Self {
        let mut message = failure.message();
        if message.trim().is_empty() {
            message = DEFAULT_UPSTREAM_MESSAGE.to_string();
        }
        if let Some(status) = failure.status() {
            message = format!("{} (HTTP {})", message, status);
        }
        if let Some(status_message) = failure.status_message() {
            message = format!("{} - {}", message, status_message);
        }

        Self {
            http_status: 502,
            message,
        }
    }
}
