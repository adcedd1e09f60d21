//! In-memory provider for tests and dry runs
//!
//! Replies are keyed by request path and, for raw MIME fetches, by the
//! `Accept` header. Unknown paths answer like the real provider does for an
//! expired message: [`ClientError::MissingEndpoint`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ClientFactory, ProviderClient, ProviderResponse, SDK_VERSION};
use crate::error::ClientError;

/// A canned reply for one route.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Successful response with the given status and JSON body
    Json { status: u16, body: Value },
    /// The provider no longer has the endpoint (expired message)
    MissingEndpoint,
    /// The provider could not be reached
    ConnectFailure,
    /// Non-success status
    Status { status: u16, body: String },
    /// Wait before answering with the inner reply
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    /// `200 OK` with `body`.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::Json { status: 200, body }
    }

    /// Delay `self` by `delay`.
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }

    async fn into_result(self, path: &str) -> Result<ProviderResponse, ClientError> {
        let mut reply = self;
        loop {
            match reply {
                Self::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                Self::Json { status, body } => return Ok(ProviderResponse { status, body }),
                Self::MissingEndpoint => {
                    return Err(ClientError::MissingEndpoint(format!(
                        "The endpoint you've tried to access does not exist: {path}"
                    )));
                }
                Self::ConnectFailure => {
                    return Err(ClientError::Connect(format!(
                        "Connection refused while requesting {path}"
                    )));
                }
                Self::Status { status, body } => return Err(ClientError::from_status(status, body)),
            }
        }
    }
}

/// A request observed by the memory provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub host: String,
    pub api_version: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub accept: Option<String>,
}

/// A client construction observed by the memory provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construction {
    /// Which generation's constructor was used (`1` or `2`)
    pub generation: u8,
    pub host: String,
    /// Version passed to the constructor, if the generation takes one
    pub api_version: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<(String, Option<String>), Reply>,
    requests: Vec<RecordedRequest>,
    constructions: Vec<Construction>,
}

/// In-memory client library. Clones share routes and recordings.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    sdk_version: String,
    state: Arc<Mutex<State>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new(SDK_VERSION)
    }
}

impl MemoryProvider {
    /// Create a provider reporting `sdk_version` as its library version.
    #[must_use]
    pub fn new(sdk_version: impl Into<String>) -> Self {
        Self {
            sdk_version: sdk_version.into(),
            state: Arc::default(),
        }
    }

    /// Answer GETs of `path` with `reply`.
    pub fn route(&self, path: impl Into<String>, reply: Reply) -> &Self {
        self.state
            .lock()
            .routes
            .insert((normalise(&path.into()), None), reply);
        self
    }

    /// Answer raw MIME GETs (`Accept: message/rfc2822`) of `path` with `reply`.
    pub fn route_raw(&self, path: impl Into<String>, reply: Reply) -> &Self {
        self.state.lock().routes.insert(
            (normalise(&path.into()), Some(super::RAW_MIME_ACCEPT.to_string())),
            reply,
        );
        self
    }

    /// Every request seen so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Every client construction seen so far.
    #[must_use]
    pub fn constructions(&self) -> Vec<Construction> {
        self.state.lock().constructions.clone()
    }

    /// A client for `host` on `api_version`, without recording a construction.
    #[must_use]
    pub fn client(&self, host: &str, api_version: &str) -> MemoryClient {
        MemoryClient {
            host: host.to_string(),
            api_version: api_version.to_string(),
            state: Arc::clone(&self.state),
        }
    }
}

impl ClientFactory for MemoryProvider {
    fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    fn connect_v1(
        &self,
        _api_key: &str,
        host: &str,
        api_version: &str,
    ) -> Box<dyn ProviderClient> {
        self.state.lock().constructions.push(Construction {
            generation: 1,
            host: host.to_string(),
            api_version: Some(api_version.to_string()),
        });
        Box::new(self.client(host, api_version))
    }

    fn connect_v2(&self, _api_key: &str, host: &str) -> Box<dyn ProviderClient> {
        self.state.lock().constructions.push(Construction {
            generation: 2,
            host: host.to_string(),
            api_version: None,
        });
        Box::new(self.client(host, "v2"))
    }
}

/// Client handed out by [`MemoryProvider`].
#[derive(Debug, Clone)]
pub struct MemoryClient {
    host: String,
    api_version: String,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl ProviderClient for MemoryClient {
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
        let path = normalise(path);
        let accept = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("accept"))
            .map(|(_, value)| (*value).to_string());

        let reply = {
            let mut state = self.state.lock();
            state.requests.push(RecordedRequest {
                host: self.host.clone(),
                api_version: self.api_version.clone(),
                path: path.clone(),
                params: params
                    .iter()
                    .map(|(name, value)| ((*name).to_string(), value.clone()))
                    .collect(),
                accept: accept.clone(),
            });
            state
                .routes
                .get(&(path.clone(), accept))
                .cloned()
                .unwrap_or(Reply::MissingEndpoint)
        };

        reply.into_result(&path).await
    }
}

fn normalise(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}
