//! Provider connection and pipeline configuration

use std::fmt;

use serde::Deserialize;

use crate::client::{DEFAULT_HOST, SDK_VERSION};

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_sdk_version() -> String {
    SDK_VERSION.to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_concurrent_resolutions() -> usize {
    4
}

/// Configuration for talking to the provider.
///
/// ```ron
/// mailgun: (
///     api_key: "key-...",
///     host: "api.eu.mailgun.net",
///     max_concurrent_resolutions: 8,
/// )
/// ```
#[derive(Clone, Deserialize)]
pub struct MailgunConfig {
    /// Private API key, sent as the basic-auth password
    pub api_key: String,

    /// API host used for event listing
    ///
    /// Default: `api.mailgun.net`
    #[serde(default = "default_host")]
    pub host: String,

    /// URL scheme for all requests
    ///
    /// Default: `https`. Only useful to change when pointing at a local test server.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Version reported by the client library, which selects the
    /// construction strategy (major version `1` or `2`)
    ///
    /// Default: the built-in client's version
    #[serde(default = "default_sdk_version")]
    pub sdk_version: String,

    /// Per-request timeout, applied by the HTTP transport
    ///
    /// Default: 30 seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum number of messages resolved concurrently within one call.
    /// Zero is treated as one.
    ///
    /// Default: 4
    #[serde(default = "default_max_concurrent_resolutions")]
    pub max_concurrent_resolutions: usize,
}

impl MailgunConfig {
    /// Configuration with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            host: default_host(),
            scheme: default_scheme(),
            sdk_version: default_sdk_version(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_resolutions: default_max_concurrent_resolutions(),
        }
    }
}

impl fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("sdk_version", &self.sdk_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_resolutions", &self.max_concurrent_resolutions)
            .finish()
    }
}
