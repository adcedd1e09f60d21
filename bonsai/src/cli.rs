use bonsai_mailgun::EventQuery;
use clap::{Args, Parser, Subcommand};

/// Fetch stored messages and delivery events from Mailgun
#[derive(Parser, Debug)]
#[command(name = "bonsai")]
#[command(about = "Fetch stored messages and delivery events from Mailgun", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored events and print their messages, one JSON object per line
    Messages {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// List events, one JSON object per line
    Events {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Print the message stored at a URL
    Message {
        /// Storage URL taken from an event
        url: String,

        /// Also fetch the raw MIME form
        #[arg(long)]
        include_raw: bool,
    },
}

/// Overrides for the configured query.
#[derive(Args, Debug, Default, Clone)]
pub struct QueryArgs {
    /// Sending domain
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Provider event type (defaults to `stored`)
    #[arg(short, long)]
    pub event_type: Option<String>,

    /// Only events from the last SECS seconds
    #[arg(short, long, value_name = "SECS")]
    pub time_range: Option<u64>,

    /// Maximum number of events
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Also fetch the raw MIME form of each message
    #[arg(long)]
    pub include_raw: bool,
}

impl QueryArgs {
    /// Apply these flags on top of `base`.
    #[must_use]
    pub fn apply(self, mut base: EventQuery) -> EventQuery {
        if let Some(domain) = self.domain {
            base.domain = domain;
        }
        if let Some(event_type) = self.event_type {
            base.event_type = Some(event_type);
        }
        if let Some(range) = self.time_range {
            base.time_range_secs = Some(range);
        }
        if let Some(limit) = self.limit {
            base.limit = Some(limit);
        }
        base.include_raw |= self.include_raw;
        base
    }
}
