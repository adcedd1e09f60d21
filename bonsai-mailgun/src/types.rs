//! Data carried through the pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where the provider keeps a stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    /// Fully-qualified URL of the stored message
    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single event record as the provider returns it.
///
/// Only the fields the pipeline reads are typed; everything else is kept
/// verbatim so transformers see the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawEvent {
    /// URL of the stored message, if the event references one.
    #[must_use]
    pub fn storage_url(&self) -> Option<&str> {
        self.storage
            .as_ref()
            .map(|storage| storage.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Paging links advertised by the listing envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// The listing response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<RawEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl EventList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A fetched message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMessage {
    /// Storage URL the message was fetched from
    pub url: String,

    /// Message body as returned by the provider
    pub payload: Map<String, Value>,

    /// Raw MIME form, when requested and available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Why an event produced no message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The provider no longer holds the message
    Expired,
    /// The provider could not be reached
    Unreachable(String),
}

/// Outcome of resolving a single message that did not fail the call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(T),
    Skipped(SkipReason),
}

impl<T> Resolution<T> {
    /// The resolved value, dropping skips.
    pub fn resolved(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Map the resolved value, keeping skips.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Resolved(value) => Resolution::Resolved(f(value)),
            Self::Skipped(reason) => Resolution::Skipped(reason),
        }
    }
}

/// Options for resolving a single message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageOptions {
    /// Forwarded verbatim to the transformer
    #[serde(default)]
    pub transformer_options: Option<Map<String, Value>>,

    /// Also fetch the raw MIME form
    #[serde(default)]
    pub include_raw: bool,
}
