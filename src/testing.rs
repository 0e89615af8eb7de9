//! Scriptable collaborator doubles shared by the unit tests.
//!
//! Each mock counts its calls so tests can assert not just on outcomes but
//! on which network calls were (not) made.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tempfile::TempDir;
use tokio::sync::Notify;

use crate::api::types::{AuthResponse, CheckoutStatus, PushRegistration, User};
use crate::api::{AccountApi, BillingApi, NotificationApi};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::push::{PushPermission, PushPlatform};
use crate::session::SessionManager;

pub(crate) fn sample_user(premium: bool) -> User {
    User {
        user_id: "user_9d1c44aa02be".to_string(),
        name: "Priscilla".to_string(),
        email: "priscilla@example.com".to_string(),
        picture: None,
        is_premium: premium,
        created_at: None,
    }
}

pub(crate) fn sample_auth_response(premium: bool) -> AuthResponse {
    AuthResponse {
        token: "brn_test_token".to_string(),
        user: sample_user(premium),
    }
}

/// A base64url application server key the push module accepts
/// (65-byte uncompressed P-256 point).
pub(crate) fn sample_server_key_b64() -> String {
    let mut bytes = vec![0x04_u8];
    bytes.extend(std::iter::repeat(0xAB).take(64));
    URL_SAFE_NO_PAD.encode(bytes)
}

// === Account service ===

/// Scriptable account service double.
#[derive(Default)]
pub(crate) struct MockAccount {
    pub reject_credentials: bool,
    pub logout_fails: bool,
    pub premium: bool,
    pub login_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub whoami_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

#[async_trait]
impl AccountApi for MockAccount {
    async fn register(&self, _: &str, _: &str, _: &str) -> Result<AuthResponse> {
        if self.reject_credentials {
            return Err(Error::CredentialRejected("Email already registered".into()));
        }
        Ok(sample_auth_response(self.premium))
    }

    async fn login(&self, _: &str, _: &str) -> Result<AuthResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials {
            return Err(Error::CredentialRejected("Invalid credentials".into()));
        }
        Ok(sample_auth_response(self.premium))
    }

    async fn exchange_session(&self, _: &str) -> Result<AuthResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials {
            return Err(Error::CredentialRejected("Invalid session".into()));
        }
        Ok(sample_auth_response(self.premium))
    }

    async fn who_am_i(&self, _: &str) -> Result<User> {
        self.whoami_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials {
            return Err(Error::CredentialRejected("Token expired".into()));
        }
        Ok(sample_user(self.premium))
    }

    async fn logout(&self, _: &str) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            return Err(Error::Transient("connection refused".into()));
        }
        Ok(())
    }
}

/// Session manager over a [`MockAccount`] and a temp-file credential store.
pub(crate) fn session_fixture(
    account: MockAccount,
) -> (TempDir, Arc<MockAccount>, Arc<SessionManager>) {
    let dir = TempDir::new().expect("temp dir");
    let store = CredentialStore::file_backed(dir.path().join("credentials.json"));
    let account = Arc::new(account);
    let manager = Arc::new(SessionManager::new(
        Arc::clone(&account) as Arc<dyn AccountApi>,
        store,
    ));
    (dir, account, manager)
}

/// A second handle to the fixture's credential store.
pub(crate) fn store_of(dir: &TempDir) -> CredentialStore {
    CredentialStore::file_backed(dir.path().join("credentials.json"))
}

// === Notification service ===

/// Scriptable notification service double.
#[derive(Default)]
pub(crate) struct MockNotification {
    pub subscribed: bool,
    pub submit_fails: bool,
    pub key_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub test_calls: AtomicUsize,
}

impl MockNotification {
    pub fn total_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
            + self.status_calls.load(Ordering::SeqCst)
            + self.submit_calls.load(Ordering::SeqCst)
            + self.remove_calls.load(Ordering::SeqCst)
            + self.test_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationApi for MockNotification {
    async fn public_key(&self) -> Result<String> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_server_key_b64())
    }

    async fn status(&self, _: &str) -> Result<bool> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subscribed)
    }

    async fn submit_subscription(&self, _: &str, _: &PushRegistration) -> Result<()> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.submit_fails {
            return Err(Error::Transient("service unavailable".into()));
        }
        Ok(())
    }

    async fn remove_subscription(&self, _: &str) -> Result<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_test(&self, _: &str) -> Result<()> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// === Push platform ===

/// Scriptable device push capability double.
pub(crate) struct MockPlatform {
    pub supported: bool,
    pub permission_result: PushPermission,
    /// Whether a platform-level registration currently exists.
    pub has_registration: AtomicBool,
    /// When set, `request_permission` parks until notified (for
    /// mutual-exclusion tests).
    pub permission_gate: Option<Arc<Notify>>,
    pub permission_calls: AtomicUsize,
    pub endpoint_calls: AtomicUsize,
    pub registration_calls: AtomicUsize,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            supported: true,
            permission_result: PushPermission::Granted,
            has_registration: AtomicBool::new(false),
            permission_gate: None,
            permission_calls: AtomicUsize::new(0),
            endpoint_calls: AtomicUsize::new(0),
            registration_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PushPlatform for MockPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> PushPermission {
        PushPermission::Default
    }

    async fn request_permission(&self) -> Result<PushPermission> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.permission_gate {
            gate.notified().await;
        }
        Ok(self.permission_result)
    }

    async fn ensure_endpoint(&self) -> Result<()> {
        self.endpoint_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_registration(&self, _server_key: &[u8]) -> Result<PushRegistration> {
        self.registration_calls.fetch_add(1, Ordering::SeqCst);
        self.has_registration.store(true, Ordering::SeqCst);
        Ok(PushRegistration {
            endpoint: "https://push.example.com/reg/device-1".to_string(),
            p256dh: "device-public-key".to_string(),
            auth: "device-auth-secret".to_string(),
        })
    }

    async fn drop_registration(&self) -> Result<bool> {
        Ok(self.has_registration.swap(false, Ordering::SeqCst))
    }
}

// === Subscription service ===

/// One scripted subscription-service response.
#[derive(Debug, Clone)]
pub(crate) enum BillingStep {
    /// Respond with the given (status, payment_status) pair.
    Status(&'static str, &'static str),
    /// Fail with a transient network error.
    Hiccup,
}

/// Subscription service double replaying a scripted response sequence.
/// Once the script is exhausted, the final step repeats.
pub(crate) struct MockBilling {
    script: Vec<BillingStep>,
    pub status_calls: AtomicUsize,
}

impl MockBilling {
    pub fn with_script(script: Vec<BillingStep>) -> Self {
        assert!(!script.is_empty(), "billing script must not be empty");
        Self {
            script,
            status_calls: AtomicUsize::new(0),
        }
    }

    /// A service that reports the same pair forever.
    pub fn always(status: &'static str, payment_status: &'static str) -> Self {
        Self::with_script(vec![BillingStep::Status(status, payment_status)])
    }
}

pub(crate) fn checkout(status: &str, payment_status: &str) -> CheckoutStatus {
    CheckoutStatus {
        status: status.to_string(),
        payment_status: payment_status.to_string(),
        amount: None,
    }
}

#[async_trait]
impl BillingApi for MockBilling {
    async fn checkout_status(&self, _: &str, _: &str) -> Result<CheckoutStatus> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .get(call)
            .unwrap_or_else(|| &self.script[self.script.len() - 1]);
        match step {
            BillingStep::Status(status, payment_status) => Ok(checkout(status, payment_status)),
            BillingStep::Hiccup => Err(Error::Transient("connection reset".into())),
        }
    }
}
