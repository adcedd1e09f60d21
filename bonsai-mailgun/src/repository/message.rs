use std::{fmt, sync::Arc};

use bonsai_common::internal;
use bonsai_tracing::traced;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::Listing;
use crate::{
    client::{ClientFactory, ProviderClient},
    compat::SdkCompat,
    config::MailgunConfig,
    error::{MailgunError, Result},
    hooks::{Passthrough, RetrievalDispatcher, Transformer},
    query::EventQuery,
    resolver::MessageResolver,
    types::{MessageOptions, Resolution, ResolvedMessage},
};

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Lists stored events and resolves each into its message.
pub struct MessageRepository<X = Passthrough> {
    listing: Listing,
    resolver: MessageResolver<X>,
    max_concurrency: usize,
}

impl<X> fmt::Debug for MessageRepository<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRepository")
            .field("listing", &self.listing)
            .field("resolver", &self.resolver)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl MessageRepository {
    /// Repository around an existing listing client.
    ///
    /// The client is moved onto the API version the listing endpoint requires.
    #[must_use]
    pub fn new(compat: SdkCompat, client: Box<dyn ProviderClient>) -> Self {
        let resolver = MessageResolver::new(compat.clone());
        Self {
            listing: Listing::new(compat, client),
            resolver,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Repository talking to the configured host through `factory`.
    ///
    /// # Errors
    ///
    /// [`MailgunError::UnsupportedSdkVersion`] if the factory's library
    /// generation is not supported.
    pub fn connect(factory: Arc<dyn ClientFactory>, config: &MailgunConfig) -> Result<Self> {
        let listing = Listing::connect(factory, config)?;
        Ok(Self {
            resolver: MessageResolver::new(listing.compat.clone()),
            listing,
            max_concurrency: config.max_concurrent_resolutions.max(1),
        })
    }
}

impl<X> MessageRepository<X>
where
    X: Transformer<ResolvedMessage> + 'static,
{
    /// Replace the transformer applied to each resolved message.
    #[must_use]
    pub fn with_transformer<Y>(self, transformer: Y) -> MessageRepository<Y>
    where
        Y: Transformer<ResolvedMessage> + 'static,
    {
        MessageRepository {
            resolver: MessageResolver::with_transformer(
                self.listing.compat.clone(),
                Arc::new(transformer),
            ),
            listing: self.listing,
            max_concurrency: self.max_concurrency,
        }
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: RetrievalDispatcher) -> Self {
        self.listing.dispatcher = Some(dispatcher);
        self
    }

    /// Number of messages resolved at once. Values below one are treated as one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// List events for `query` and resolve their messages.
    ///
    /// Expired and unreachable messages are left out. The result keeps the
    /// listing order. Without a transformer each item is a [`ResolvedMessage`]
    /// wrapping the provider's message body verbatim in `payload`.
    ///
    /// # Errors
    ///
    /// [`MailgunError::MissingDomain`] before any request if the query has no
    /// domain; otherwise the first listing, resolution or transform failure.
    pub async fn get_list(&self, query: &EventQuery) -> Result<Vec<X::Output>> {
        self.get_list_with_cancellation(query, CancellationToken::new())
            .await
    }

    /// [`get_list`](Self::get_list), abandoning outstanding work once `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// As [`get_list`](Self::get_list), plus [`MailgunError::Cancelled`].
    #[traced(instrument(level = tracing::Level::DEBUG, skip_all, fields(domain = %query.domain), err), timing(precision = "ms"))]
    pub async fn get_list_with_cancellation(
        &self,
        query: &EventQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<X::Output>> {
        let events = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(MailgunError::Cancelled),
            events = self.listing.retrieve(query) => events?,
        };
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let urls: Vec<String> = events
            .items
            .iter()
            .filter_map(|event| {
                let url = event.storage_url();
                if url.is_none() {
                    internal!(level = DEBUG, id = ?event.id, "Event has no stored message, skipping");
                }
                url.map(str::to_string)
            })
            .collect();

        let options = Arc::new(MessageOptions {
            transformer_options: query.transformer_options.clone(),
            include_raw: query.include_raw,
        });

        let total = urls.len();
        let mut results: Vec<Option<X::Output>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut pending = urls.into_iter().enumerate();
        let mut join_set = JoinSet::new();

        for _ in 0..self.max_concurrency.min(pending.len()) {
            if let Some((index, url)) = pending.next() {
                self.spawn_resolution(&mut join_set, index, url, &options);
            }
        }

        loop {
            let joined = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    join_set.abort_all();
                    internal!(level = DEBUG, total, "Message resolution cancelled");
                    return Err(MailgunError::Cancelled);
                }
                joined = join_set.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            let (index, outcome) = joined?;

            match outcome {
                Ok(Resolution::Resolved(message)) => results[index] = Some(message),
                Ok(Resolution::Skipped(_)) => {}
                Err(error) => {
                    join_set.abort_all();
                    return Err(error);
                }
            }

            if let Some((index, url)) = pending.next() {
                self.spawn_resolution(&mut join_set, index, url, &options);
            }
        }

        let messages: Vec<_> = results.into_iter().flatten().collect();
        internal!(
            level = DEBUG,
            total,
            resolved = messages.len(),
            "Resolved stored messages"
        );
        Ok(messages)
    }

    /// Resolve a single stored message.
    ///
    /// # Errors
    ///
    /// Provider failures other than expiry or connectivity, or a failing
    /// transformer.
    pub async fn get_one(
        &self,
        url: &str,
        options: &MessageOptions,
    ) -> Result<Resolution<X::Output>> {
        self.resolver.resolve(url, options).await
    }

    fn spawn_resolution(
        &self,
        join_set: &mut JoinSet<(usize, Result<Resolution<X::Output>>)>,
        index: usize,
        url: String,
        options: &Arc<MessageOptions>,
    ) {
        let resolver = self.resolver.clone();
        let options = Arc::clone(options);
        join_set.spawn(async move { (index, resolver.resolve(&url, &options).await) });
    }
}
