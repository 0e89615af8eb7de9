//! HTTP clients for the backend service collaborators.
//!
//! Three externally defined HTTP/JSON contracts are consumed here: the
//! account service (identity), the notification service (web push) and the
//! subscription service (checkout settlement). Each is exposed as an
//! `async_trait` so the session, push and entitlement components can be
//! exercised against mocks.
//!
//! # Error classification
//!
//! Responses are classified once, in [`check_status`]: 401 means the
//! presented credential was rejected, 403 means the account lacks the
//! required entitlement, anything else non-2xx (and all transport errors)
//! is transient and safe to retry.

pub mod account;
pub mod billing;
pub mod notification;
pub mod types;

pub use account::{AccountApi, HttpAccountApi};
pub use billing::{BillingApi, HttpBillingApi};
pub use notification::{HttpNotificationApi, NotificationApi};

use std::time::Duration;

use crate::error::{Error, Result};

/// HTTP client request timeout for API calls.
///
/// Applies to individual requests. 10 seconds is sufficient for these
/// endpoints while preventing indefinite hangs on network issues.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared reqwest client used by the service clients.
///
/// Callers should reuse one client per service for connection pooling.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Error payload shape used by the backend (`{"detail": "..."}`).
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Classify a non-success response into the crate error taxonomy.
///
/// Consumes the response body to extract the backend's `detail` message
/// when present.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };

    match status.as_u16() {
        401 => Err(Error::CredentialRejected(detail)),
        403 => Err(Error::CapabilityDenied("premium subscription required")),
        _ => Err(Error::Transient(format!("HTTP {status}: {detail}"))),
    }
}
