//! Notification service client: push subscription registry.
//!
//! The service owns the authoritative subscription state; the local
//! `subscribed` flag is only ever a copy of what these endpoints report.

use async_trait::async_trait;

use super::types::{PushRegistration, PushStatusResponse, ServerKeyResponse};
use super::{check_status, http_client};
use crate::error::Result;

/// Contract consumed from the notification service.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch the application server public key (base64url):
    /// `GET /api/push/vapid-key`. Unauthenticated.
    async fn public_key(&self) -> Result<String>;

    /// Whether this account has an active subscription:
    /// `GET /api/push/status`.
    async fn status(&self, token: &str) -> Result<bool>;

    /// Register a device push registration: `POST /api/push/subscribe`.
    async fn submit_subscription(&self, token: &str, registration: &PushRegistration)
        -> Result<()>;

    /// Remove this account's subscription: `DELETE /api/push/unsubscribe`.
    async fn remove_subscription(&self, token: &str) -> Result<()>;

    /// Ask the service to deliver a test notification:
    /// `POST /api/push/test`.
    async fn send_test(&self, token: &str) -> Result<()>;
}

/// HTTP implementation of [`NotificationApi`].
#[derive(Debug, Clone)]
pub struct HttpNotificationApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationApi {
    /// Create a client for the given API base (e.g. `https://berean.app/api`).
    pub fn new(api_base: &str) -> Self {
        Self {
            client: http_client(),
            base_url: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn public_key(&self) -> Result<String> {
        let url = format!("{}/push/vapid-key", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body = check_status(response)
            .await?
            .json::<ServerKeyResponse>()
            .await?;
        Ok(body.public_key)
    }

    async fn status(&self, token: &str) -> Result<bool> {
        let url = format!("{}/push/status", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let body = check_status(response)
            .await?
            .json::<PushStatusResponse>()
            .await?;
        Ok(body.subscribed)
    }

    async fn submit_subscription(
        &self,
        token: &str,
        registration: &PushRegistration,
    ) -> Result<()> {
        let url = format!("{}/push/subscribe", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(registration)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn remove_subscription(&self, token: &str) -> Result<()> {
        let url = format!("{}/push/unsubscribe", self.base_url);
        let response = self.client.delete(&url).bearer_auth(token).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn send_test(&self, token: &str) -> Result<()> {
        let url = format!("{}/push/test", self.base_url);
        let response = self.client.post(&url).bearer_auth(token).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
