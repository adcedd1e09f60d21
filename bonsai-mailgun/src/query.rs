//! Event query and its translation into provider parameters

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MailgunError, Result};

/// Event type requested when the query does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "stored";

#[allow(clippy::unnecessary_wraps)]
fn default_event_type() -> Option<String> {
    Some(DEFAULT_EVENT_TYPE.to_string())
}

/// What to list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventQuery {
    /// Sending domain; required
    #[serde(default)]
    pub domain: String,

    /// Provider event type filter
    ///
    /// Default: `stored`
    #[serde(default = "default_event_type")]
    pub event_type: Option<String>,

    /// Only events from the last `time_range_secs` seconds
    #[serde(default)]
    pub time_range_secs: Option<u64>,

    /// Maximum number of events to list
    #[serde(default)]
    pub limit: Option<u32>,

    /// Also fetch the raw MIME form of each message
    #[serde(default)]
    pub include_raw: bool,

    /// Forwarded verbatim to the transformer
    #[serde(default)]
    pub transformer_options: Option<Map<String, Value>>,
}

impl EventQuery {
    /// A query for `domain` with every other field at its default.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            event_type: default_event_type(),
            time_range_secs: None,
            limit: None,
            include_raw: false,
            transformer_options: None,
        }
    }

    #[must_use]
    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    #[must_use]
    pub const fn with_time_range(mut self, secs: u64) -> Self {
        self.time_range_secs = Some(secs);
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn with_raw(mut self, include_raw: bool) -> Self {
        self.include_raw = include_raw;
        self
    }

    #[must_use]
    pub fn with_transformer_options(mut self, options: Map<String, Value>) -> Self {
        self.transformer_options = Some(options);
        self
    }
}

/// Provider query parameters derived from an [`EventQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub event: Option<String>,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    pub limit: Option<u32>,
}

impl QueryParams {
    /// Build parameters using the current time for the window.
    ///
    /// # Errors
    ///
    /// [`MailgunError::MissingDomain`] if the query has no domain.
    pub fn build(query: &EventQuery) -> Result<Self> {
        Self::build_at(query, Utc::now())
    }

    /// Build parameters with the window ending at `now`.
    ///
    /// # Errors
    ///
    /// [`MailgunError::MissingDomain`] if the query has no domain.
    pub fn build_at(query: &EventQuery, now: DateTime<Utc>) -> Result<Self> {
        if query.domain.is_empty() {
            return Err(MailgunError::MissingDomain);
        }

        let mut params = Self {
            event: query
                .event_type
                .as_ref()
                .filter(|event_type| !event_type.is_empty())
                .cloned(),
            ..Self::default()
        };

        if let Some(range) = query.time_range_secs.filter(|range| *range > 0) {
            let end = now.timestamp();
            let range = i64::try_from(range).unwrap_or(i64::MAX);
            params.begin = Some(end.saturating_sub(range));
            params.end = Some(end);
        }

        params.limit = query.limit.filter(|limit| *limit > 0);

        Ok(params)
    }

    /// Parameters as `(name, value)` pairs, in `event, begin, end, limit` order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(event) = &self.event {
            pairs.push(("event", event.clone()));
        }
        if let Some(begin) = self.begin {
            pairs.push(("begin", begin.to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
