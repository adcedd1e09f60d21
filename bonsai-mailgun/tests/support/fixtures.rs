//! Canned provider data and repositories wired to a [`MemoryProvider`]

use std::sync::Arc;

use bonsai_mailgun::{
    MailgunConfig, MemoryProvider, MessageRepository, Reply, client::SDK_VERSION,
};
use serde_json::{Value, json};

pub const DOMAIN: &str = "mg.example.com";
pub const STORAGE_HOST: &str = "se.api.mailgun.net";

/// Storage URL for message `key`.
pub fn storage_url(key: &str) -> String {
    format!("https://{STORAGE_HOST}/v3/{}", message_path(key))
}

/// Endpoint path (relative to the API version) for message `key`.
pub fn message_path(key: &str) -> String {
    format!("domains/{DOMAIN}/messages/{key}")
}

pub fn stored_event(key: &str) -> Value {
    json!({
        "id": format!("evt-{key}"),
        "event": "stored",
        "timestamp": 1_700_000_000.0,
        "storage": { "url": storage_url(key), "key": key },
    })
}

pub fn message_body(key: &str) -> Value {
    json!({
        "subject": format!("Message {key}"),
        "sender": "bob@example.com",
        "body-plain": "Hello",
    })
}

/// A provider listing one stored event per key.
pub fn provider_with_events(keys: &[&str]) -> MemoryProvider {
    provider_with_events_on(SDK_VERSION, keys)
}

pub fn provider_with_events_on(sdk_version: &str, keys: &[&str]) -> MemoryProvider {
    let provider = MemoryProvider::new(sdk_version);
    provider.route(
        format!("{DOMAIN}/events"),
        Reply::ok(json!({
            "items": keys.iter().map(|key| stored_event(key)).collect::<Vec<_>>(),
            "paging": {},
        })),
    );
    provider
}

/// Serve `message_body(key)` for each key.
pub fn with_messages(provider: &MemoryProvider, keys: &[&str]) {
    for key in keys {
        provider.route(message_path(key), Reply::ok(message_body(key)));
    }
}

pub fn repository(provider: &MemoryProvider) -> MessageRepository {
    MessageRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("key-123"))
        .expect("supported library version")
}

/// Requests that fetched a message rather than listed events.
pub fn message_requests(provider: &MemoryProvider) -> usize {
    provider
        .requests()
        .iter()
        .filter(|request| request.path.starts_with("domains/"))
        .count()
}
