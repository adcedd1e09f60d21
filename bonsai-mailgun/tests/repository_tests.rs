//! Listing and resolution behaviour against the in-memory provider

mod support;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bonsai_mailgun::{
    EventQuery, EventRepository, EventsRetrieved, FnTransformer, MailgunConfig, MailgunError,
    MemoryProvider, MessageOptions, MessageRepository, RawEvent, Reply, Resolution,
    ResolvedMessage, RetrievalDispatcher, SdkCompat, SkipReason, TransformOptions,
    client::Construction,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use support::fixtures::{
    DOMAIN, STORAGE_HOST, message_body, message_path, message_requests, provider_with_events,
    provider_with_events_on, repository, storage_url, with_messages,
};
use tokio_util::sync::CancellationToken;

fn subjects(messages: &[ResolvedMessage]) -> Vec<String> {
    messages
        .iter()
        .map(|message| message.payload["subject"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_empty_domain_fails_without_requests() {
    let provider = provider_with_events(&["a"]);

    let error = repository(&provider)
        .get_list(&EventQuery::new(""))
        .await
        .unwrap_err();

    assert!(matches!(error, MailgunError::MissingDomain));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_default_query_scenario() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a", "b"]);

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN).with_limit(2))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message a", "Message b"]);
    assert_eq!(messages[0].url, storage_url("a"));
    assert_eq!(messages[0].payload, *message_body("a").as_object().unwrap());
    assert_eq!(messages[0].raw, None);

    let requests = provider.requests();
    let listing = &requests[0];
    assert_eq!(listing.path, format!("{DOMAIN}/events"));
    assert_eq!(listing.api_version, "v3");
    assert_eq!(
        listing.params,
        vec![
            ("event".to_string(), "stored".to_string()),
            ("limit".to_string(), "2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_time_range_is_sent_as_window() {
    let provider = provider_with_events(&[]);

    repository(&provider)
        .get_list(&EventQuery::new(DOMAIN).with_time_range(3600))
        .await
        .unwrap();

    let requests = provider.requests();
    let params = &requests[0].params;
    let value = |name: &str| -> i64 {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.parse::<i64>().unwrap())
            .unwrap()
    };
    assert_eq!(value("end") - value("begin"), 3600);
}

#[tokio::test]
async fn test_no_events_skips_listener_and_resolution() {
    let provider = provider_with_events(&[]);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let messages = repository(&provider)
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            move |_: &mut EventsRetrieved<'_>| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        ))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert!(messages.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(message_requests(&provider), 0);
}

#[tokio::test]
async fn test_listener_removing_everything_skips_resolution() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a", "b"]);

    let messages = repository(&provider)
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            |signal: &mut EventsRetrieved<'_>| signal.events.items.clear(),
        ))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert!(messages.is_empty());
    assert_eq!(message_requests(&provider), 0);
}

#[tokio::test]
async fn test_listener_filters_already_processed_events() {
    let provider = provider_with_events(&["a", "b", "c"]);
    with_messages(&provider, &["a", "b", "c"]);

    let messages = repository(&provider)
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            |signal: &mut EventsRetrieved<'_>| {
                assert_eq!(signal.name(), "bonsai.mailgun.events_retrieved");
                signal
                    .events
                    .items
                    .retain(|event| event.id.as_deref() != Some("evt-b"));
            },
        ))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message a", "Message c"]);
    assert_eq!(message_requests(&provider), 2);
}

#[tokio::test]
async fn test_expired_message_is_skipped() {
    let provider = provider_with_events(&["a", "b", "c"]);
    with_messages(&provider, &["a", "c"]);
    provider.route(message_path("b"), Reply::MissingEndpoint);

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message a", "Message c"]);
}

#[tokio::test]
async fn test_one_of_two_expired() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["b"]);

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN).with_limit(2))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message b"]);
}

#[tokio::test]
async fn test_unreachable_message_is_skipped() {
    let provider = provider_with_events(&["a", "b", "c"]);
    with_messages(&provider, &["a", "c"]);
    provider.route(message_path("b"), Reply::ConnectFailure);

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message a", "Message c"]);
}

#[tokio::test]
async fn test_other_fetch_failures_fail_the_call() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a"]);
    provider.route(
        message_path("b"),
        Reply::Status {
            status: 500,
            body: "Internal error".to_string(),
        },
    );

    let error = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap_err();

    assert!(error.is_provider(), "{error:?}");
}

#[tokio::test]
async fn test_listing_failure_fails_the_call() {
    let provider = MemoryProvider::default();
    provider.route(format!("{DOMAIN}/events"), Reply::ConnectFailure);

    let error = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap_err();

    assert!(matches!(error, MailgunError::Client(ref inner) if inner.is_connect()));
}

#[tokio::test]
async fn test_include_raw() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a", "b"]);
    provider.route_raw(message_path("a"), Reply::ok(json!("MIME-Version: 1.0")));
    provider.route_raw(
        message_path("b"),
        Reply::Status {
            status: 500,
            body: "Internal error".to_string(),
        },
    );

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN).with_raw(true))
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].raw.as_deref(), Some("\"MIME-Version: 1.0\""));
    assert_eq!(messages[1].raw, None);
    assert_eq!(messages[1].payload, *message_body("b").as_object().unwrap());
}

#[tokio::test]
async fn test_raw_is_not_fetched_unless_asked() {
    let provider = provider_with_events(&["a"]);
    with_messages(&provider, &["a"]);

    repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert!(
        provider
            .requests()
            .iter()
            .all(|request| request.accept.is_none())
    );
}

#[tokio::test]
async fn test_transformer_runs_once_per_message() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a", "b"]);
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);

    let transformer = FnTransformer(move |message: ResolvedMessage, options: &TransformOptions| {
        counted.fetch_add(1, Ordering::SeqCst);
        let tag = options.get("tag").cloned().unwrap_or(Value::Null);
        anyhow::Ok(json!({ "subject": message.payload["subject"], "tag": tag }))
    });

    let query = EventQuery::new(DOMAIN)
        .with_transformer_options(json!({ "tag": "inbox" }).as_object().unwrap().clone());
    let messages = repository(&provider)
        .with_transformer(transformer)
        .get_list(&query)
        .await
        .unwrap();

    assert_eq!(
        messages,
        vec![
            json!({ "subject": "Message a", "tag": "inbox" }),
            json!({ "subject": "Message b", "tag": "inbox" }),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failing_transformer_fails_the_call() {
    let provider = provider_with_events(&["a"]);
    with_messages(&provider, &["a"]);

    let error = repository(&provider)
        .with_transformer(FnTransformer(
            |_: ResolvedMessage, _: &TransformOptions| -> anyhow::Result<()> {
                anyhow::bail!("cannot map message")
            },
        ))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap_err();

    assert!(matches!(error, MailgunError::Transform(ref reason) if reason.contains("cannot map")));
}

#[tokio::test]
async fn test_order_is_kept_when_completion_is_not() {
    let keys = ["a", "b", "c", "d", "e"];
    let provider = provider_with_events(&keys);
    for (index, key) in keys.iter().enumerate() {
        let delay = Duration::from_millis(10 * (keys.len() - index) as u64);
        provider.route(message_path(key), Reply::ok(message_body(key)).after(delay));
    }

    let messages = repository(&provider)
        .with_max_concurrency(3)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(
        subjects(&messages),
        keys.iter().map(|key| format!("Message {key}")).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_zero_concurrency_from_config_still_resolves_everything() {
    let provider = provider_with_events(&["a", "b"]);
    with_messages(&provider, &["a", "b"]);
    let config: MailgunConfig =
        ron::from_str(r#"(api_key: "k", max_concurrent_resolutions: 0)"#).unwrap();

    let messages = MessageRepository::connect(Arc::new(provider.clone()), &config)
        .unwrap()
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(subjects(&messages), vec!["Message a", "Message b"]);
    assert_eq!(message_requests(&provider), 2);
}

#[tokio::test]
async fn test_cancellation() {
    let provider = provider_with_events(&["a", "b"]);
    for key in ["a", "b"] {
        provider.route(
            message_path(key),
            Reply::ok(message_body(key)).after(Duration::from_secs(30)),
        );
    }
    let repository = repository(&provider);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let error = tokio::time::timeout(
        Duration::from_secs(5),
        repository.get_list_with_cancellation(&EventQuery::new(DOMAIN), cancel),
    )
    .await
    .expect("cancellation should end the call promptly")
    .unwrap_err();

    assert!(matches!(error, MailgunError::Cancelled));
}

#[tokio::test]
async fn test_get_one() {
    let provider = MemoryProvider::default();
    with_messages(&provider, &["a"]);
    provider.route_raw(message_path("a"), Reply::ok(json!("raw")));
    let repository = repository(&provider);

    let outcome = repository
        .get_one(
            &storage_url("a"),
            &MessageOptions {
                include_raw: true,
                ..MessageOptions::default()
            },
        )
        .await
        .unwrap();
    let Resolution::Resolved(message) = outcome else {
        panic!("expected a resolved message, got {outcome:?}");
    };
    assert_eq!(message.raw.as_deref(), Some("\"raw\""));

    let outcome = repository
        .get_one(&storage_url("expired"), &MessageOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome, Resolution::Skipped(SkipReason::Expired));
}

#[tokio::test]
async fn test_non_object_message_is_malformed() {
    let provider = MemoryProvider::default();
    provider.route(message_path("a"), Reply::ok(json!(["not", "a", "message"])));

    let error = repository(&provider)
        .get_one(&storage_url("a"), &MessageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, MailgunError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_per_event_clients_follow_storage_url() {
    let provider = provider_with_events(&["a"]);
    with_messages(&provider, &["a"]);

    repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    let requests = provider.requests();
    let fetch = &requests[1];
    assert_eq!(fetch.host, STORAGE_HOST);
    assert_eq!(fetch.api_version, "v3");
    assert_eq!(fetch.path, message_path("a"));
    assert_eq!(provider.constructions()[1].host, STORAGE_HOST);
}

#[tokio::test]
async fn test_generation_one_clients() {
    let provider = provider_with_events_on("1.7.2", &["a"]);
    with_messages(&provider, &["a"]);

    let messages = repository(&provider)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(
        provider.constructions(),
        vec![
            Construction {
                generation: 1,
                host: "api.mailgun.net".to_string(),
                api_version: Some("v3".to_string()),
            },
            Construction {
                generation: 1,
                host: STORAGE_HOST.to_string(),
                api_version: Some("v3".to_string()),
            },
        ]
    );
}

#[tokio::test]
async fn test_injected_generation_two_client_is_moved_to_v3() {
    let provider = provider_with_events(&[]);
    let compat = SdkCompat::new(Arc::new(provider.clone()), "key-123").unwrap();
    let client = Box::new(provider.client("api.mailgun.net", "v2"));

    MessageRepository::new(compat, client)
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(provider.requests()[0].api_version, "v3");
}

#[tokio::test]
async fn test_unsupported_library_version() {
    let provider = provider_with_events_on("3.0.0", &["a"]);

    let error = MessageRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("k"))
        .unwrap_err();

    assert!(matches!(error, MailgunError::UnsupportedSdkVersion(ref v) if v == "3.0.0"));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_event_repository() {
    let provider = provider_with_events(&["a", "b"]);

    let events = EventRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("k"))
        .unwrap()
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            |signal: &mut EventsRetrieved<'_>| signal.events.items.truncate(1),
        ))
        .with_transformer(FnTransformer(|event: RawEvent, _: &TransformOptions| {
            anyhow::Ok(event.id.unwrap_or_default())
        }))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert_eq!(events, vec!["evt-a".to_string()]);
    assert_eq!(message_requests(&provider), 0);

    let error = EventRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("k"))
        .unwrap()
        .get_list(&EventQuery::new(""))
        .await
        .unwrap_err();
    assert!(matches!(error, MailgunError::MissingDomain));
}

#[tokio::test]
async fn test_event_repository_with_no_events() {
    let provider = provider_with_events(&[]);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let events = EventRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("k"))
        .unwrap()
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            move |_: &mut EventsRetrieved<'_>| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        ))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_event_repository_listener_removing_everything() {
    let provider = provider_with_events(&["a", "b"]);
    let transformed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transformed);

    let events = EventRepository::connect(Arc::new(provider.clone()), &MailgunConfig::new("k"))
        .unwrap()
        .with_dispatcher(RetrievalDispatcher::new().with_listener(
            |signal: &mut EventsRetrieved<'_>| signal.events.items.clear(),
        ))
        .with_transformer(FnTransformer(move |event: RawEvent, _: &TransformOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(event)
        }))
        .get_list(&EventQuery::new(DOMAIN))
        .await
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(transformed.load(Ordering::SeqCst), 0);
    assert_eq!(message_requests(&provider), 0);
}
