//! reqwest-backed provider client

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bonsai_common::{incoming, outgoing};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::{ClientFactory, ProviderClient, ProviderResponse};
use crate::{config::MailgunConfig, error::ClientError};

/// Version reported by the built-in client library.
pub const SDK_VERSION: &str = "2.8.1";

/// Default provider API host.
pub const DEFAULT_HOST: &str = "api.mailgun.net";

const V1_DEFAULT_API_VERSION: &str = "v3";

// Generation 2 starts out on an API version the events endpoint rejects.
const V2_DEFAULT_API_VERSION: &str = "v2";

const BASIC_AUTH_USER: &str = "api";

/// Builds [`HttpClient`]s that share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    scheme: String,
    sdk_version: String,
}

impl HttpClientFactory {
    /// Create a factory from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: &MailgunConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("bonsai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            scheme: config.scheme.clone(),
            sdk_version: config.sdk_version.clone(),
        })
    }

    fn client(&self, api_key: &str, host: &str, api_version: &str) -> HttpClient {
        HttpClient {
            http: self.http.clone(),
            scheme: self.scheme.clone(),
            host: host.to_string(),
            api_version: api_version.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

impl ClientFactory for HttpClientFactory {
    fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    fn connect_v1(
        &self,
        api_key: &str,
        host: &str,
        api_version: &str,
    ) -> Box<dyn ProviderClient> {
        Box::new(self.client(api_key, host, api_version))
    }

    fn connect_v2(&self, api_key: &str, host: &str) -> Box<dyn ProviderClient> {
        Box::new(self.client(api_key, host, V2_DEFAULT_API_VERSION))
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            scheme: "https".to_string(),
            sdk_version: SDK_VERSION.to_string(),
        }
    }
}

/// A provider client for one host and API version.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    scheme: String,
    host: String,
    api_version: String,
    api_key: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Generation 1 style client with the default API version.
    #[must_use]
    pub fn new(api_key: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            scheme: "https".to_string(),
            host: host.into(),
            api_version: V1_DEFAULT_API_VERSION.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Full URL for a path relative to the API version.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}://{}/{}/{}",
            self.scheme,
            self.host,
            self.api_version,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ProviderClient for HttpClient {
    fn host(&self) -> &str {
        &self.host
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn set_api_version(&mut self, api_version: &str) {
        api_version.clone_into(&mut self.api_version);
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<ProviderResponse, ClientError> {
        let url = self.url_for(path);
        outgoing!(level = DEBUG, %url, params = params.len(), "GET");

        let mut request = self
            .http
            .get(&url)
            .basic_auth(BASIC_AUTH_USER, Some(&self.api_key))
            .query(params);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        let text = response.text().await?;

        incoming!(level = DEBUG, %url, status, bytes = text.len(), "Response");

        if !(200..300).contains(&status) {
            return Err(ClientError::from_status(status, text));
        }

        let body = if is_json {
            serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?
        } else {
            Value::String(text)
        };

        Ok(ProviderResponse { status, body })
    }
}
