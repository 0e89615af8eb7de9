//! Wire types shared by the service clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as returned by the account service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Avatar URL, set for federated sign-ins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Premium entitlement flag. Authoritative on the backend, cached here.
    #[serde(default)]
    pub is_premium: bool,
    /// Account creation time. Omitted by the who-am-i endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Response from login, register and OAuth-session exchange: the bearer
/// token plus the user fields flattened alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Opaque session bearer token.
    pub token: String,
    /// The signed-in user.
    #[serde(flatten)]
    pub user: User,
}

/// Partial user update applied in memory after out-of-band confirmation
/// (e.g. a settled checkout), avoiding a full who-am-i refetch.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// New display name, if changed.
    pub name: Option<String>,
    /// New avatar URL, if changed.
    pub picture: Option<String>,
    /// New entitlement flag, if changed.
    pub is_premium: Option<bool>,
}

impl UserPatch {
    /// Patch that flips the premium entitlement on.
    pub fn premium() -> Self {
        Self {
            is_premium: Some(true),
            ..Self::default()
        }
    }
}

/// A device push registration: the platform-issued endpoint/key pair used
/// to address push messages to this device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRegistration {
    /// Push service endpoint URL.
    pub endpoint: String,
    /// Device P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// Response from the notification service's public-key endpoint.
#[derive(Debug, Deserialize)]
pub struct ServerKeyResponse {
    /// Application server public key (base64url, uncompressed P-256 point).
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Response from the notification service's status endpoint.
#[derive(Debug, Deserialize)]
pub struct PushStatusResponse {
    /// Whether this account currently has an active subscription.
    pub subscribed: bool,
}

/// Checkout session state as reported by the subscription service.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutStatus {
    /// Session state (e.g. `"open"`, `"complete"`, `"expired"`).
    pub status: String,
    /// Payment state (e.g. `"unpaid"`, `"pending"`, `"paid"`).
    pub payment_status: String,
    /// Amount in major units, when the service reports it.
    #[serde(default)]
    pub amount: Option<f64>,
}

impl CheckoutStatus {
    /// Payment has settled.
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// The checkout session lapsed without payment.
    pub fn is_expired(&self) -> bool {
        self.status == "expired"
    }
}
