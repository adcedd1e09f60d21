use bonsai_common::internal;

use crate::{
    client::ProviderClient,
    error::{MailgunError, Result},
    query::QueryParams,
    types::EventList,
};

/// List events for `domain`.
///
/// Only the first page is read. A `next` link in the envelope is logged and
/// otherwise ignored.
///
/// # Errors
///
/// Any transport failure, or [`MailgunError::MalformedResponse`] if the
/// envelope cannot be decoded.
pub async fn list_events(
    client: &dyn ProviderClient,
    domain: &str,
    params: &QueryParams,
) -> Result<EventList> {
    let path = format!("{domain}/events");
    let response = client.get(&path, &params.to_pairs(), &[]).await?;

    let events: EventList = serde_json::from_value(response.body)
        .map_err(|e| MailgunError::MalformedResponse(format!("{path}: {e}")))?;

    internal!(
        level = DEBUG,
        domain,
        count = events.len(),
        "Listed events"
    );

    if let Some(next) = events.paging.as_ref().and_then(|paging| paging.next.as_deref()) {
        internal!(level = DEBUG, domain, next, "Ignoring further pages of events");
    }

    Ok(events)
}
