//! Resolution of a stored-message URL into the message itself.

use std::{fmt, sync::Arc};

use bonsai_common::internal;
use bonsai_tracing::traced;
use serde_json::Value;

use crate::{
    client::{ProviderClient, RAW_MIME_ACCEPT},
    compat::SdkCompat,
    error::{ClientError, MailgunError, Result},
    hooks::{Passthrough, TransformOptions, Transformer},
    types::{MessageOptions, Resolution, ResolvedMessage, SkipReason},
};

/// A storage URL split into the parts needed to fetch it.
///
/// `https://se.api.mailgun.net/v3/domains/d/messages/k` becomes protocol
/// `https:`, host `se.api.mailgun.net`, version `v3` and path
/// `domains/d/messages/k`. Missing parts are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageUrl {
    pub protocol: String,
    pub host: String,
    pub api_version: String,
    pub path: String,
}

impl StorageUrl {
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let mut segments = url.split('/');
        let mut next = || segments.next().unwrap_or_default().to_string();

        let protocol = next();
        let _ = next();
        let host = next();
        let api_version = next();

        Self {
            protocol,
            host,
            api_version,
            path: segments.collect::<Vec<_>>().join("/"),
        }
    }
}

/// Fetches stored messages and runs them through a transformer.
pub struct MessageResolver<X = Passthrough> {
    compat: SdkCompat,
    transformer: Arc<X>,
}

impl<X> Clone for MessageResolver<X> {
    fn clone(&self) -> Self {
        Self {
            compat: self.compat.clone(),
            transformer: Arc::clone(&self.transformer),
        }
    }
}

impl<X> fmt::Debug for MessageResolver<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageResolver")
            .field("compat", &self.compat)
            .finish_non_exhaustive()
    }
}

impl MessageResolver {
    #[must_use]
    pub fn new(compat: SdkCompat) -> Self {
        Self::with_transformer(compat, Arc::new(Passthrough))
    }
}

impl<X> MessageResolver<X>
where
    X: Transformer<ResolvedMessage>,
{
    #[must_use]
    pub const fn with_transformer(compat: SdkCompat, transformer: Arc<X>) -> Self {
        Self {
            compat,
            transformer,
        }
    }

    /// Fetch and transform the message stored at `url`.
    ///
    /// # Errors
    ///
    /// Provider failures other than expiry or connectivity, a non-object
    /// message body, or a failing transformer.
    #[traced(instrument(level = tracing::Level::DEBUG, skip(self, options), err), timing(precision = "ms"))]
    pub async fn resolve(
        &self,
        url: &str,
        options: &MessageOptions,
    ) -> Result<Resolution<X::Output>> {
        let message = match self.fetch(url, options.include_raw).await? {
            Resolution::Resolved(message) => message,
            Resolution::Skipped(reason) => return Ok(Resolution::Skipped(reason)),
        };

        let transform_options = TransformOptions::new(options.transformer_options.clone());
        self.transformer
            .transform(message, &transform_options)
            .map(Resolution::Resolved)
            .map_err(|e| MailgunError::Transform(format!("{e:#}")))
    }

    /// Fetch the message stored at `url` without transforming it.
    ///
    /// # Errors
    ///
    /// Provider failures other than expiry or connectivity, or a non-object
    /// message body.
    pub async fn fetch(&self, url: &str, include_raw: bool) -> Result<Resolution<ResolvedMessage>> {
        let location = StorageUrl::parse(url);
        let client = self
            .compat
            .build_client_for(&location.host, &location.api_version);

        let response = match client.get(&location.path, &[], &[]).await {
            Ok(response) => response,
            Err(error) => return classify(url, error).map(Resolution::Skipped),
        };

        let Value::Object(payload) = response.body else {
            return Err(MailgunError::MalformedResponse(format!(
                "{url}: expected a JSON object"
            )));
        };

        let raw = if include_raw {
            fetch_raw(client.as_ref(), url, &location.path).await
        } else {
            None
        };

        Ok(Resolution::Resolved(ResolvedMessage {
            url: url.to_string(),
            payload,
            raw,
        }))
    }
}

/// Expired and unreachable messages are skipped; anything else fails the call.
fn classify(url: &str, error: ClientError) -> Result<SkipReason> {
    match error {
        ClientError::MissingEndpoint(_) => {
            internal!(level = DEBUG, url, "Message expired, skipping");
            Ok(SkipReason::Expired)
        }
        ClientError::Connect(reason) => {
            internal!(level = WARN, url, %reason, "Could not reach provider, skipping message");
            Ok(SkipReason::Unreachable(reason))
        }
        error => Err(error.into()),
    }
}

async fn fetch_raw(client: &dyn ProviderClient, url: &str, path: &str) -> Option<String> {
    match client.get(path, &[], &[("Accept", RAW_MIME_ACCEPT)]).await {
        Ok(response) if response.is_ok() => match serde_json::to_string(&response.body) {
            Ok(raw) => Some(raw),
            Err(error) => {
                internal!(level = DEBUG, url, %error, "Could not encode raw message");
                None
            }
        },
        Ok(response) => {
            internal!(level = DEBUG, url, status = response.status, "Raw message not available");
            None
        }
        Err(error) => {
            internal!(level = DEBUG, url, %error, "Raw message request failed");
            None
        }
    }
}
