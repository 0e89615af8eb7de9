//! Account service client: credential exchange and identity lookup.

use async_trait::async_trait;
use serde_json::json;

use super::types::{AuthResponse, User};
use super::{check_status, http_client};
use crate::error::Result;

/// Contract consumed from the account service.
///
/// Tokens returned here are opaque bearer credentials; this core never
/// interprets their contents.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Create an account and sign in: `POST /api/auth/register`.
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse>;

    /// Sign in with email and password: `POST /api/auth/login`.
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// Exchange a one-time federated sign-in session id for a token:
    /// `POST /api/auth/session`.
    async fn exchange_session(&self, session_id: &str) -> Result<AuthResponse>;

    /// Look up the user behind a bearer token: `GET /api/auth/me`.
    async fn who_am_i(&self, token: &str) -> Result<User>;

    /// Invalidate the session server-side: `POST /api/auth/logout`.
    async fn logout(&self, token: &str) -> Result<()>;
}

/// HTTP implementation of [`AccountApi`].
#[derive(Debug, Clone)]
pub struct HttpAccountApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccountApi {
    /// Create a client for the given API base (e.g. `https://berean.app/api`).
    pub fn new(api_base: &str) -> Self {
        Self {
            client: http_client(),
            base_url: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AccountApi for HttpAccountApi {
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}/auth/register", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        Ok(check_status(response).await?.json::<AuthResponse>().await?)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(check_status(response).await?.json::<AuthResponse>().await?)
    }

    async fn exchange_session(&self, session_id: &str) -> Result<AuthResponse> {
        let url = format!("{}/auth/session", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "session_id": session_id }))
            .send()
            .await?;
        Ok(check_status(response).await?.json::<AuthResponse>().await?)
    }

    async fn who_am_i(&self, token: &str) -> Result<User> {
        let url = format!("{}/auth/me", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        Ok(check_status(response).await?.json::<User>().await?)
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let url = format!("{}/auth/logout", self.base_url);
        let response = self.client.post(&url).bearer_auth(token).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
