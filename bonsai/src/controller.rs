use std::{io::Write, sync::Arc};

use bonsai_common::{internal, tracing};
use bonsai_mailgun::{
    ClientFactory, EventRepository, HttpClientFactory, MailgunError, MessageOptions,
    MessageRepository, Resolution, SkipReason,
};
use bonsai_tracing::traced;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{cli::Command, config::Config};

/// Runs CLI commands against the configured provider.
#[derive(Debug)]
pub struct Bonsai {
    config: Config,
    factory: Arc<dyn ClientFactory>,
}

impl Bonsai {
    /// Talk to the provider over HTTP.
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let factory = HttpClientFactory::new(&config.mailgun)?;
        Ok(Self::with_factory(config, Arc::new(factory)))
    }

    #[must_use]
    pub fn with_factory(config: Config, factory: Arc<dyn ClientFactory>) -> Self {
        Self { config, factory }
    }

    /// Run `command`, writing results to `out` as JSON lines.
    ///
    /// # Errors
    ///
    /// Any provider or configuration failure, or failure to write output.
    #[traced(instrument(level = tracing::Level::TRACE, skip_all, err), timing(precision = "ms"))]
    pub async fn run<W: Write>(
        &self,
        command: Command,
        out: &mut W,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        match command {
            Command::Messages { query } => {
                let query = query.apply(self.config.default_query());
                let repository =
                    MessageRepository::connect(Arc::clone(&self.factory), &self.config.mailgun)?;
                let messages = repository.get_list_with_cancellation(&query, cancel).await?;
                internal!(
                    level = INFO,
                    domain = %query.domain,
                    count = messages.len(),
                    "Fetched messages"
                );
                write_lines(out, &messages)?;
            }
            Command::Events { query } => {
                let query = query.apply(self.config.default_query());
                let repository =
                    EventRepository::connect(Arc::clone(&self.factory), &self.config.mailgun)?;
                let events = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(MailgunError::Cancelled.into()),
                    events = repository.get_list(&query) => events?,
                };
                internal!(
                    level = INFO,
                    domain = %query.domain,
                    count = events.len(),
                    "Fetched events"
                );
                write_lines(out, &events)?;
            }
            Command::Message { url, include_raw } => {
                let repository =
                    MessageRepository::connect(Arc::clone(&self.factory), &self.config.mailgun)?;
                let options = MessageOptions {
                    include_raw,
                    ..MessageOptions::default()
                };
                match repository.get_one(&url, &options).await? {
                    Resolution::Resolved(message) => write_lines(out, &[message])?,
                    Resolution::Skipped(SkipReason::Expired) => {
                        eprintln!("Message is no longer stored by the provider: {url}");
                    }
                    Resolution::Skipped(SkipReason::Unreachable(reason)) => {
                        eprintln!("Provider could not be reached ({reason}): {url}");
                    }
                }
            }
        }

        Ok(())
    }
}

fn write_lines<W: Write, T: Serialize>(out: &mut W, items: &[T]) -> anyhow::Result<()> {
    for item in items {
        serde_json::to_writer(&mut *out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
