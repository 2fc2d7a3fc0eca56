//! Error types for the Hearth appliance

use std::fmt;

use thiserror::Error;

/// Result type alias for Hearth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversational turn
#[derive(Debug, Error)]
pub enum Error {
    /// Capture/playback utility or hardware missing
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Utility ran but failed (non-zero exit, busy device)
    #[error("device failure: {0}")]
    DeviceFailure(String),

    /// Remote call exceeded its deadline
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// Connection, DNS or HTTP-level failure
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Payload did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Expected field or content type absent
    #[error("content missing: {0}")]
    ContentMissing(String),

    /// No usable input; a legitimate skip rather than a failure
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Configuration file unreadable or out of range
    #[error("configuration error: {0}")]
    Config(String),

    /// Invariant violated inside the appliance itself
    #[error("internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result of a call to an external collaborator
///
/// The collaborator logs the full error itself; the caller only sees the
/// classification.
pub type ProviderResponse<T> = std::result::Result<T, ErrorKind>;

/// Log `result`'s error under `operation` and reduce it to its classification
pub(crate) fn classify<T>(operation: &str, result: Result<T>) -> ProviderResponse<T> {
    result.map_err(|e| {
        let kind = e.kind();
        tracing::warn!(operation, kind = %kind, error = %e, "external call failed");
        kind
    })
}

/// Closed classification of failures, used in log fields and session records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DeviceUnavailable,
    DeviceFailure,
    NetworkTimeout,
    NetworkFailure,
    MalformedResponse,
    ContentMissing,
    EmptyInput,
    Config,
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name for log output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceUnavailable => "device_unavailable",
            Self::DeviceFailure => "device_failure",
            Self::NetworkTimeout => "network_timeout",
            Self::NetworkFailure => "network_failure",
            Self::MalformedResponse => "malformed_response",
            Self::ContentMissing => "content_missing",
            Self::EmptyInput => "empty_input",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error into the appliance's failure taxonomy
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::DeviceFailure(_) => ErrorKind::DeviceFailure,
            Self::NetworkTimeout(_) => ErrorKind::NetworkTimeout,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::MalformedResponse(_) | Self::Serialization(_) => ErrorKind::MalformedResponse,
            Self::ContentMissing(_) => ErrorKind::ContentMissing,
            Self::EmptyInput(_) => ErrorKind::EmptyInput,
            Self::Config(_) | Self::Toml(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::DeviceUnavailable
            }
            Self::Io(_) => ErrorKind::DeviceFailure,
            Self::Http(e) if e.is_timeout() => ErrorKind::NetworkTimeout,
            Self::Http(e) if e.is_decode() => ErrorKind::MalformedResponse,
            Self::Http(_) => ErrorKind::NetworkFailure,
        }
    }

    /// Whether this error is a skip rather than a failure
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.kind() == ErrorKind::EmptyInput
    }
}
