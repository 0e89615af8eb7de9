//! Subscription service client: checkout settlement status.
//!
//! Checkout creation and webhook processing are backend concerns; the
//! client core only asks whether a pending checkout has settled.

use async_trait::async_trait;

use super::types::CheckoutStatus;
use super::{check_status, http_client};
use crate::error::Result;

/// Contract consumed from the subscription service.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Current state of a checkout session:
    /// `GET /api/subscription/status/{session_id}`.
    async fn checkout_status(&self, token: &str, session_id: &str) -> Result<CheckoutStatus>;
}

/// HTTP implementation of [`BillingApi`].
#[derive(Debug, Clone)]
pub struct HttpBillingApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBillingApi {
    /// Create a client for the given API base (e.g. `https://berean.app/api`).
    pub fn new(api_base: &str) -> Self {
        Self {
            client: http_client(),
            base_url: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BillingApi for HttpBillingApi {
    async fn checkout_status(&self, token: &str, session_id: &str) -> Result<CheckoutStatus> {
        let url = format!("{}/subscription/status/{}", self.base_url, session_id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        Ok(check_status(response)
            .await?
            .json::<CheckoutStatus>()
            .await?)
    }
}
