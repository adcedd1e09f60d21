//! Typed error handling for event listing and message resolution.
//!
//! Two layers:
//! - [`ClientError`]: what a provider client reports for a single request.
//!   It keeps "the endpoint is gone" apart from "could not reach the
//!   provider", since the resolver treats both as skips rather than failures.
//! - [`MailgunError`]: what a repository call fails with. Anything that
//!   reaches the caller as this type aborted the whole call.

use thiserror::Error;

/// Errors reported by a [`ProviderClient`](crate::ProviderClient) request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The provider does not know the requested endpoint (HTTP 404).
    ///
    /// For stored messages this means the message has expired; the provider
    /// keeps them for roughly three days.
    #[error("Endpoint not found: {0}")]
    MissingEndpoint(String),

    /// The API key was rejected (HTTP 401).
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Could not connect to the provider, or the request timed out.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Returns `true` if the provider reported the endpoint as missing.
    #[must_use]
    pub const fn is_missing_endpoint(&self) -> bool {
        matches!(self, Self::MissingEndpoint(_))
    }

    /// Returns `true` for connectivity failures that may succeed later.
    #[must_use]
    pub const fn is_connect(&self) -> bool {
        matches!(self, Self::Connect(_))
    }

    /// Classify a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::InvalidCredentials(body),
            404 => Self::MissingEndpoint(body),
            _ => Self::Http { status, body },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::Connect(error.to_string())
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Top-level error for repository calls.
#[derive(Debug, Error)]
pub enum MailgunError {
    /// The query did not name a sending domain.
    #[error("The domain for which to retrieve events must be provided")]
    MissingDomain,

    /// The client library reports a major version this crate cannot drive.
    #[error("Unsupported client library version: {0}")]
    UnsupportedSdkVersion(String),

    /// A provider request failed in a way that is not recoverable here.
    #[error("Provider request failed: {0}")]
    Client(#[from] ClientError),

    /// The provider answered with something that is not the expected shape.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A caller-supplied transformer failed.
    #[error("Transformer failed: {0}")]
    Transform(String),

    /// The batch was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A resolution task ended without producing an outcome.
    #[error("Resolution task failed: {0}")]
    Task(String),
}

impl MailgunError {
    /// Returns `true` for configuration errors, which are raised before any I/O.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingDomain | Self::UnsupportedSdkVersion(_))
    }

    /// Returns `true` if the error came from the provider or its transport.
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Client(_) | Self::MalformedResponse(_))
    }
}

impl From<tokio::task::JoinError> for MailgunError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Task(error.to_string())
        }
    }
}

/// Specialized `Result` type for repository operations.
pub type Result<T, E = MailgunError> = std::result::Result<T, E>;
