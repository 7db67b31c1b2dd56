//! HTTP contract tests for the notification client.
//!
//! Each test stands up a `wiremock` server playing the backend and checks the
//! method, path, auth header and body mapping of one endpoint.

use addiscare_client::{ClientConfig, NotificationClient};
use addiscare_core::{
    BulkSendRequest, Error, ErrorKind, ListQuery, NotificationApi, NotificationType, Role,
    SendNotificationRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> NotificationClient {
    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_token("test-token")
        .with_timeout(5);
    NotificationClient::new(config).expect("Failed to create client")
}

#[tokio::test]
async fn test_list_sends_limit_and_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(query_param("limit", "50"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "n2",
                "title": "Report assigned",
                "message": "Your report was assigned to Bole sub-city",
                "type": "alert",
                "read": false,
                "createdAt": "2024-05-02T10:00:00Z"
            },
            {
                "_id": "n1",
                "title": "Welcome",
                "message": "Thanks for joining",
                "type": "info",
                "read": true,
                "createdAt": "2024-05-01T10:00:00Z"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server)
        .list(&ListQuery::with_limit(50))
        .await
        .expect("list should succeed");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "n2");
    assert_eq!(items[0].kind, NotificationType::Alert);
    assert!(!items[0].read);
    assert!(items[1].read);
}

#[tokio::test]
async fn test_list_accepts_wrapped_body_and_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notifications"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "notifications": [
                {"_id": "n9", "title": "Older", "createdAt": "2024-04-01T00:00:00Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery {
        limit: 10,
        cursor: Some("abc".to_string()),
    };
    let items = client_for(&server).list(&query).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "n9");
}

#[tokio::test]
async fn test_unread_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 12})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).unread_count().await.unwrap(), 12);
}

#[tokio::test]
async fn test_mutation_endpoints_use_contract_methods() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/notifications/n1/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/notifications/mark-all-read"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "count": 3})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/notifications/n2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/notifications/n3/hide"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.mark_read("n1").await.unwrap();
    assert_eq!(client.mark_all_read().await.unwrap(), 3);
    client.delete("n2").await.unwrap();
    client.hide("n3").await.unwrap();
}

#[tokio::test]
async fn test_ids_are_sent_as_one_encoded_segment() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/notifications/a%2Fb/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/notifications/x%3Flimit%3D1/hide"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/notifications/n%231"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.mark_read("a/b").await.unwrap();
    client.hide("x?limit=1").await.unwrap();
    client.delete("n#1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.url.query().is_none()));
}

#[tokio::test]
async fn test_dot_segment_ids_rejected_locally() {
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for id in ["", ".", ".."] {
        let err = client.delete(id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert!(client.mark_read("..").await.is_err());
}

#[tokio::test]
async fn test_mark_all_read_tolerates_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert_eq!(client_for(&server).mark_all_read().await.unwrap(), 0);
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/notifications/gone/read"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Notification not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Token expired"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notifications"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.mark_read("gone").await.unwrap_err();
    assert_eq!(err, Error::NotFound("Notification not found".to_string()));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = client.unread_count().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let err = client.list(&ListQuery::with_limit(5)).await.unwrap_err();
    assert!(matches!(err, Error::Server { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    let config = ClientConfig::default()
        .with_base_url("http://127.0.0.1:9")
        .with_timeout(2);
    let client = NotificationClient::new(config).unwrap();

    let err = client.unread_count().await.unwrap_err();
    assert!(matches!(err, Error::Request(_)));
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn test_send_posts_body_and_returns_created() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications"))
        .and(body_json(json!({
            "title": "Inspection scheduled",
            "message": "A crew visits tomorrow",
            "recipientId": "u7",
            "reportId": "r3"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "n100",
            "title": "Inspection scheduled",
            "message": "A crew visits tomorrow",
            "type": "info",
            "read": false,
            "createdAt": "2024-06-01T08:00:00Z",
            "reportId": "r3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server)
        .send(&SendNotificationRequest {
            title: "Inspection scheduled".to_string(),
            message: "A crew visits tomorrow".to_string(),
            recipient_id: "u7".to_string(),
            report_id: Some("r3".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(created.id, "n100");
    assert_eq!(created.report_id.as_deref(), Some("r3"));
}

#[tokio::test]
async fn test_send_bulk_surfaces_validation_errors_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications/bulk"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Validation failed",
            "errors": [
                {"field": "message", "message": "Message must be at least 5 characters"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .send_bulk(&BulkSendRequest {
            title: "Heads up".to_string(),
            message: "Hi".to_string(),
            role: Role::Government,
            report_id: None,
        })
        .await
        .unwrap_err();

    match err {
        Error::Validation { message, fields } => {
            assert_eq!(message, "Validation failed");
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "message");
            assert_eq!(fields[0].message, "Message must be at least 5 characters");
        }
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_bulk_returns_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/notifications/bulk"))
        .and(body_json(json!({
            "title": "Flood warning",
            "message": "Avoid the Kebena river crossing",
            "role": "all"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"success": true, "count": 240})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .send_bulk(&BulkSendRequest {
            title: "Flood warning".to_string(),
            message: "Avoid the Kebena river crossing".to_string(),
            role: Role::All,
            report_id: None,
        })
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.count, 240);
}
