use std::{fmt, sync::Arc};

use bonsai_tracing::traced;

use super::Listing;
use crate::{
    client::{ClientFactory, ProviderClient},
    compat::SdkCompat,
    config::MailgunConfig,
    error::{MailgunError, Result},
    hooks::{Passthrough, RetrievalDispatcher, TransformOptions, Transformer},
    query::EventQuery,
    types::RawEvent,
};

/// Lists events without fetching their messages.
pub struct EventRepository<X = Passthrough> {
    listing: Listing,
    transformer: X,
}

impl<X> fmt::Debug for EventRepository<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRepository")
            .field("listing", &self.listing)
            .finish_non_exhaustive()
    }
}

impl EventRepository {
    #[must_use]
    pub fn new(compat: SdkCompat, client: Box<dyn ProviderClient>) -> Self {
        Self {
            listing: Listing::new(compat, client),
            transformer: Passthrough,
        }
    }

    /// # Errors
    ///
    /// [`MailgunError::UnsupportedSdkVersion`] if the factory's library
    /// generation is not supported.
    pub fn connect(factory: Arc<dyn ClientFactory>, config: &MailgunConfig) -> Result<Self> {
        Ok(Self {
            listing: Listing::connect(factory, config)?,
            transformer: Passthrough,
        })
    }
}

impl<X> EventRepository<X>
where
    X: Transformer<RawEvent>,
{
    /// Replace the transformer applied to each event.
    #[must_use]
    pub fn with_transformer<Y>(self, transformer: Y) -> EventRepository<Y>
    where
        Y: Transformer<RawEvent>,
    {
        EventRepository {
            listing: self.listing,
            transformer,
        }
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: RetrievalDispatcher) -> Self {
        self.listing.dispatcher = Some(dispatcher);
        self
    }

    /// List events for `query`, filtered by the dispatcher and transformed.
    ///
    /// # Errors
    ///
    /// [`MailgunError::MissingDomain`] before any request if the query has no
    /// domain; otherwise the listing failure or the first transform failure.
    #[traced(instrument(level = tracing::Level::DEBUG, skip_all, fields(domain = %query.domain), err), timing(precision = "ms"))]
    pub async fn get_list(&self, query: &EventQuery) -> Result<Vec<X::Output>> {
        let events = self.listing.retrieve(query).await?;
        let options = TransformOptions::new(query.transformer_options.clone());

        events
            .items
            .into_iter()
            .map(|event| {
                self.transformer
                    .transform(event, &options)
                    .map_err(|e| MailgunError::Transform(format!("{e:#}")))
            })
            .collect()
    }
}
