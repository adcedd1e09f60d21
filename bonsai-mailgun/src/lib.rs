//! Delivery events and stored messages from the Mailgun API.
//!
//! A [`MessageRepository`] lists stored-delivery events for a domain, lets
//! registered listeners drop the ones the caller has already seen, then
//! fetches each remaining message. Messages the provider no longer keeps, or
//! cannot currently serve, are left out of the result rather than failing it.
//!
//! ```no_run
//! # async fn run() -> bonsai_mailgun::Result<()> {
//! use std::sync::Arc;
//!
//! use bonsai_mailgun::{EventQuery, HttpClientFactory, MailgunConfig, MessageRepository};
//!
//! let config = MailgunConfig::new("key-...");
//! let factory = Arc::new(HttpClientFactory::new(&config)?);
//! let repository = MessageRepository::connect(factory, &config)?;
//!
//! let messages = repository
//!     .get_list(&EventQuery::new("mg.example.com").with_limit(10))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod compat;
pub mod config;
pub mod error;
pub mod hooks;
pub mod lister;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod types;

pub use client::{
    ClientFactory, HttpClient, HttpClientFactory, MemoryProvider, ProviderClient, ProviderResponse,
    Reply,
};
pub use compat::{SdkCompat, SdkGeneration};
pub use config::MailgunConfig;
pub use error::{ClientError, MailgunError, Result};
pub use hooks::{
    EventsRetrieved, FnTransformer, Passthrough, RetrievalDispatcher, RetrievalListener,
    TransformOptions, Transformer,
};
pub use lister::list_events;
pub use query::{EventQuery, QueryParams};
pub use repository::{EventRepository, MessageRepository};
pub use resolver::{MessageResolver, StorageUrl};
pub use types::{
    EventList, MessageOptions, Paging, RawEvent, Resolution, ResolvedMessage, SkipReason, Storage,
};
