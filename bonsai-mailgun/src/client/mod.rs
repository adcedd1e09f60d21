//! Provider client abstraction.
//!
//! The pipeline talks to the provider only through [`ProviderClient`], and
//! creates per-host clients only through [`ClientFactory`]. Two
//! implementations ship with the crate:
//!
//! - [`HttpClientFactory`] / [`HttpClient`]: reqwest over HTTPS with basic auth.
//! - [`MemoryProvider`]: canned replies and request recording, for tests and
//!   dry runs.

mod http;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

pub use http::{DEFAULT_HOST, HttpClient, HttpClientFactory, SDK_VERSION};
pub use memory::{Construction, MemoryClient, MemoryProvider, RecordedRequest, Reply};

use crate::error::ClientError;

/// `Accept` value that asks the provider for the raw MIME form of a message.
pub const RAW_MIME_ACCEPT: &str = "message/rfc2822";

/// A successful provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// HTTP status code (always 2xx; failures are [`ClientError`]s)
    pub status: u16,
    /// Decoded body. JSON responses are parsed, anything else is kept as a string.
    pub body: Value,
}

impl ProviderResponse {
    /// Returns `true` for a plain `200 OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A client bound to one provider host and API version.
#[async_trait]
pub trait ProviderClient: Send + Sync + fmt::Debug {
    /// Host this client sends requests to.
    fn host(&self) -> &str;

    /// API version segment used for request paths (e.g. `v3`).
    fn api_version(&self) -> &str;

    /// Reconfigure the API version used for subsequent requests.
    fn set_api_version(&mut self, api_version: &str);

    /// Issue a GET for `path` (relative to `/{api_version}/`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingEndpoint`] when the provider does not know
    /// the path, [`ClientError::Connect`] when it cannot be reached, and other
    /// variants for everything else.
    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<ProviderResponse, ClientError>;
}

/// The client library: exposes its version and the constructors of both
/// supported major generations.
pub trait ClientFactory: Send + Sync + fmt::Debug {
    /// Full version string of the client library, e.g. `2.8.1`.
    fn sdk_version(&self) -> &str;

    /// Generation 1 constructor: key, host and API version in one call.
    fn connect_v1(&self, api_key: &str, host: &str, api_version: &str)
    -> Box<dyn ProviderClient>;

    /// Generation 2 constructor: key and endpoint host. The API version is
    /// left at the library default and must be set afterwards.
    fn connect_v2(&self, api_key: &str, host: &str) -> Box<dyn ProviderClient>;
}
