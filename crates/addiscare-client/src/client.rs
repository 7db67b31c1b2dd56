//! `reqwest` implementation of [`NotificationApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use addiscare_core::{
    BulkOutcome, BulkSendRequest, Error, ListQuery, Notification, NotificationApi, Result,
    SendNotificationRequest,
};

use crate::config::ClientConfig;
use crate::wire::{error_from_response, CountResponse, ListResponse};

/// REST client for the notification endpoints.
#[derive(Clone)]
pub struct NotificationClient {
    client: Client,
    config: ClientConfig,
}

impl NotificationClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            authenticated = config.token.is_some(),
            "Initializing notification client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Path of one notification, with the id percent-encoded as a single
    /// segment so ids containing `/`, `?` or `#` cannot reach another route.
    /// Dot segments are rejected since URL normalization would resolve them.
    fn notification_path(id: &str, action: Option<&str>) -> Result<String> {
        if matches!(id, "" | "." | "..") {
            return Err(Error::InvalidInput(format!("Invalid notification id: {:?}", id)));
        }
        let mut path = format!("/notifications/{}", urlencoding::encode(id));
        if let Some(action) = action {
            path.push('/');
            path.push_str(action);
        }
        Ok(path)
    }

    /// Build a request with the bearer token attached if configured.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.endpoint(path);
        let mut req = self.client.request(method, &url);

        if let Some(ref token) = self.config.token {
            req = req.bearer_auth(token);
        }

        req
    }

    /// Send a request and map non-2xx statuses onto the error taxonomy.
    async fn execute(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Request(format!("Request timed out: {}", e))
            } else {
                Error::Request(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_from_response(status.as_u16(), &body);
        warn!(status = status.as_u16(), error = %err, "Notification API request failed");
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let response = self.execute(req).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl NotificationApi for NotificationClient {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Notification>> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(ref cursor) = query.cursor {
            params.push(("cursor", cursor.clone()));
        }

        let body: ListResponse = self
            .json(self.request(Method::GET, "/notifications").query(&params))
            .await?;
        let items = body.into_items();
        debug!(item_count = items.len(), limit = query.limit, "Fetched notifications");
        Ok(items)
    }

    async fn unread_count(&self) -> Result<u64> {
        let body: CountResponse = self
            .json(self.request(Method::GET, "/notifications/unread-count"))
            .await?;
        debug!(unread_count = body.count, "Fetched unread count");
        Ok(body.count)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let path = Self::notification_path(id, Some("read"))?;
        self.execute(self.request(Method::PATCH, &path)).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<u64> {
        let response = self
            .execute(self.request(Method::PATCH, "/notifications/mark-all-read"))
            .await?;
        // Older servers answer with an empty body.
        let bytes = response.bytes().await?;
        let outcome: BulkOutcome = serde_json::from_slice(&bytes).unwrap_or_default();
        Ok(outcome.count)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = Self::notification_path(id, None)?;
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn hide(&self, id: &str) -> Result<()> {
        let path = Self::notification_path(id, Some("hide"))?;
        self.execute(self.request(Method::PUT, &path)).await?;
        Ok(())
    }

    async fn send(&self, req: &SendNotificationRequest) -> Result<Notification> {
        let notification: Notification = self
            .json(self.request(Method::POST, "/notifications").json(req))
            .await?;
        debug!(notification_id = %notification.id, recipient_id = %req.recipient_id, "Created notification");
        Ok(notification)
    }

    async fn send_bulk(&self, req: &BulkSendRequest) -> Result<BulkOutcome> {
        let outcome: BulkOutcome = self
            .json(self.request(Method::POST, "/notifications/bulk").json(req))
            .await?;
        debug!(role = %req.role, count = outcome.count, "Created bulk notifications");
        Ok(outcome)
    }
}
