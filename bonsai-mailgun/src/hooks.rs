//! Extension points around the pipeline.
//!
//! - Listeners registered with a [`RetrievalDispatcher`] see the listed events
//!   before any message is fetched, and may drop or edit them in place.
//! - A [`Transformer`] maps each returned item into the caller's shape.

use std::{fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::types::EventList;

/// Signal delivered to listeners once events have been listed.
#[derive(Debug)]
pub struct EventsRetrieved<'a> {
    /// Domain the events were listed for
    pub domain: &'a str,
    /// Listed events; listeners may mutate or remove items
    pub events: &'a mut EventList,
}

impl EventsRetrieved<'_> {
    pub const NAME: &'static str = "bonsai.mailgun.events_retrieved";

    #[must_use]
    pub const fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Receives [`EventsRetrieved`] signals.
pub trait RetrievalListener: Send + Sync {
    fn on_events_retrieved(&self, signal: &mut EventsRetrieved<'_>);
}

impl<F> RetrievalListener for F
where
    F: Fn(&mut EventsRetrieved<'_>) + Send + Sync,
{
    fn on_events_retrieved(&self, signal: &mut EventsRetrieved<'_>) {
        self(signal);
    }
}

/// Ordered set of retrieval listeners.
#[derive(Clone, Default)]
pub struct RetrievalDispatcher {
    listeners: Vec<Arc<dyn RetrievalListener>>,
}

impl fmt::Debug for RetrievalDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RetrievalDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener; listeners run in registration order.
    #[must_use]
    pub fn with_listener(mut self, listener: impl RetrievalListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn register(&mut self, listener: Arc<dyn RetrievalListener>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Hand `events` to every listener.
    pub fn dispatch(&self, domain: &str, events: &mut EventList) {
        let mut signal = EventsRetrieved { domain, events };
        for listener in &self.listeners {
            listener.on_events_retrieved(&mut signal);
        }
    }
}

/// Options forwarded to a [`Transformer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOptions {
    pub transformer_options: Option<Map<String, Value>>,
}

impl TransformOptions {
    #[must_use]
    pub const fn new(transformer_options: Option<Map<String, Value>>) -> Self {
        Self {
            transformer_options,
        }
    }

    /// Look up a single caller option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.transformer_options.as_ref()?.get(key)
    }
}

/// Maps pipeline items into the caller's shape.
pub trait Transformer<I>: Send + Sync {
    type Output: Send + 'static;

    /// Transform one item.
    ///
    /// # Errors
    ///
    /// Any error fails the whole call.
    fn transform(&self, item: I, options: &TransformOptions) -> anyhow::Result<Self::Output>;
}

/// Returns items unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl<I: Send + 'static> Transformer<I> for Passthrough {
    type Output = I;

    fn transform(&self, item: I, _options: &TransformOptions) -> anyhow::Result<I> {
        Ok(item)
    }
}

/// Adapts a closure into a [`Transformer`].
pub struct FnTransformer<F>(pub F);

impl<F> fmt::Debug for FnTransformer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnTransformer")
    }
}

impl<I, O, F> Transformer<I> for FnTransformer<F>
where
    F: Fn(I, &TransformOptions) -> anyhow::Result<O> + Send + Sync,
    O: Send + 'static,
{
    type Output = O;

    fn transform(&self, item: I, options: &TransformOptions) -> anyhow::Result<O> {
        (self.0)(item, options)
    }
}
