//! Wiremock fixtures shared by the notification session tests.

#![allow(dead_code)]

use std::sync::Arc;

use addiscare_client::{ClientConfig, NotificationClient};
use addiscare_notify::{NotificationSession, NotifyConfig};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A notification as the backend serializes it.
pub fn notification(id: &str, title: &str, read: bool) -> Value {
    json!({
        "_id": id,
        "title": title,
        "message": format!("{} details", title),
        "type": "info",
        "read": read,
        "createdAt": "2024-05-01T10:00:00Z"
    })
}

/// Serve `items` from the list endpoint and `unread` from the count endpoint.
pub async fn mount_feed(server: &MockServer, items: Vec<Value>, unread: u64) {
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(items)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": unread })))
        .mount(server)
        .await;
}

/// Replace every mock with a new feed.
pub async fn reset_feed(server: &MockServer, items: Vec<Value>, unread: u64) {
    server.reset().await;
    mount_feed(server, items, unread).await;
}

pub fn client_for(server: &MockServer) -> Arc<NotificationClient> {
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_token("session-token")
        .with_timeout(5);
    Arc::new(NotificationClient::new(config).expect("Failed to create client"))
}

/// Session against `server` with background polling off, after one sync.
pub async fn synced_session(server: &MockServer) -> NotificationSession {
    let session = NotificationSession::start(
        client_for(server),
        NotifyConfig::default().with_enabled(false),
    )
    .expect("Failed to start session");
    session.refresh().await.expect("Initial sync failed");
    session
}
