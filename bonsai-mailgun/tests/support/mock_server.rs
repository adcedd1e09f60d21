//! Minimal provider HTTP API for exercising the reqwest client.
//!
//! - `GET /v3/{domain}/events`: one stored event pointing back at this
//!   server, with the received query parameters echoed under `echo`
//! - `GET /v3/domains/{domain}/messages/{key}`: the message, or a raw MIME
//!   document when asked for `message/rfc2822`; key `gone` answers 404
//! - `GET /v3/text`: a plain-text body
//!
//! Every route answers 401 unless called with `api:key-123`.

use std::{collections::HashMap, net::SocketAddr};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};

pub const API_KEY: &str = "key-123";
const AUTHORIZATION: &str = "Basic YXBpOmtleS0xMjM=";

pub struct MockProviderServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockProviderServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let router = Router::new()
            .route("/v3/text", get(text))
            .route("/v3/domains/{domain}/messages/{key}", get(message))
            .route("/v3/{domain}/events", get(events))
            .with_state(addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, handle }
    }

    /// `host:port` of the running server.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn refused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(AUTHORIZATION);

    if authorized {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "Forbidden").into_response())
    }
}

async fn events(
    State(addr): State<SocketAddr>,
    Path(domain): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }

    Json(json!({
        "items": [{
            "id": "evt-1",
            "event": "stored",
            "storage": {
                "url": format!("http://{addr}/v3/domains/{domain}/messages/k1"),
                "key": "k1",
            },
        }],
        "paging": {},
        "echo": params,
    }))
    .into_response()
}

async fn message(Path((domain, key)): Path<(String, String)>, headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    if key == "gone" {
        return (StatusCode::NOT_FOUND, "Message not found").into_response();
    }

    let wants_raw = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        == Some("message/rfc2822");

    if wants_raw {
        Json(json!({ "body-mime": format!("Subject: {key}\r\n\r\nHello") })).into_response()
    } else {
        Json(json!({ "subject": format!("Message {key}"), "domain": domain })).into_response()
    }
}

async fn text(headers: HeaderMap) -> Response {
    if let Err(response) = authorized(&headers) {
        return response;
    }
    "plain body".into_response()
}
