//! Entry points: list events, or list and resolve stored messages.

mod event;
mod message;

use std::{fmt, sync::Arc};

use bonsai_common::internal;

pub use event::EventRepository;
pub use message::MessageRepository;

use crate::{
    client::{ClientFactory, ProviderClient},
    compat::SdkCompat,
    config::MailgunConfig,
    error::Result,
    hooks::RetrievalDispatcher,
    lister::list_events,
    query::{EventQuery, QueryParams},
    types::EventList,
};

/// Listing half shared by both repositories.
#[derive(Clone)]
struct Listing {
    compat: SdkCompat,
    client: Arc<dyn ProviderClient>,
    dispatcher: Option<RetrievalDispatcher>,
}

impl fmt::Debug for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listing")
            .field("compat", &self.compat)
            .field("client", &self.client)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Listing {
    fn new(compat: SdkCompat, mut client: Box<dyn ProviderClient>) -> Self {
        compat.normalize_client(client.as_mut());
        Self {
            compat,
            client: Arc::from(client),
            dispatcher: None,
        }
    }

    fn connect(factory: Arc<dyn ClientFactory>, config: &MailgunConfig) -> Result<Self> {
        let compat = SdkCompat::new(factory, config.api_key.clone())?;
        let client = compat.client_for_host(&config.host);
        Ok(Self {
            compat,
            client: Arc::from(client),
            dispatcher: None,
        })
    }

    /// List events for the query and let listeners filter them.
    ///
    /// The returned list is empty when nothing was listed or every item was
    /// filtered out.
    async fn retrieve(&self, query: &EventQuery) -> Result<EventList> {
        let params = QueryParams::build(query)?;
        let mut events = list_events(self.client.as_ref(), &query.domain, &params).await?;

        if events.is_empty() {
            return Ok(events);
        }

        if let Some(dispatcher) = &self.dispatcher {
            let before = events.len();
            dispatcher.dispatch(&query.domain, &mut events);
            internal!(
                level = DEBUG,
                domain = %query.domain,
                before,
                after = events.len(),
                "Dispatched retrieved events"
            );
        }

        Ok(events)
    }
}
