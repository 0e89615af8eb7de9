//! Push subscription lifecycle.
//!
//! Owns the process-wide push state (supported, permission, subscribed,
//! loading) and orchestrates capability detection, permission negotiation,
//! registration with the notification service, and teardown. Everything is
//! gated on the session: only a signed-in premium user may touch the
//! network here.
//!
//! # State machine
//!
//! `supported` and the initial `permission` are probed once at startup.
//! `subscribed` is authoritative on the notification service; the local
//! flag is refreshed whenever the gating condition (token + premium)
//! becomes true and mutated only by subscribe/unsubscribe completions.
//! `loading` is the mutual-exclusion flag for subscribe/unsubscribe: a
//! second call while one is in flight is rejected, never interleaved.
//!
//! # Abort semantics
//!
//! Any failing step aborts the whole subscribe sequence without leaving a
//! partial subscription registered with the backend. The platform-level
//! registration may survive an abort; it is inert and the next attempt
//! proceeds from default state without manual intervention.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::sync::watch;

use crate::access::{capability, Capability};
use crate::api::types::PushRegistration;
use crate::api::NotificationApi;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPermission {
    /// Not yet asked.
    Default,
    /// User granted notifications.
    Granted,
    /// User declined; retried only if they change platform settings and
    /// subscribe again.
    Denied,
}

impl std::fmt::Display for PushPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Process-wide push subscription state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushState {
    /// Platform supports push delivery. Probed once at startup.
    pub supported: bool,
    /// Current notification permission.
    pub permission: PushPermission,
    /// Authoritative copy of the notification service's subscription flag.
    pub subscribed: bool,
    /// True for the full duration of a subscribe/unsubscribe.
    pub loading: bool,
}

/// Device push capability, abstracted for testing and for embedders.
///
/// Implementations wrap whatever the host surface provides: a service
/// worker + PushManager in a browser shell, UNUserNotificationCenter on
/// mobile, nothing at all in a terminal.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Probe platform push capability. Called once at startup.
    fn is_supported(&self) -> bool;

    /// Current permission without prompting.
    fn permission(&self) -> PushPermission;

    /// Prompt the user for notification permission.
    async fn request_permission(&self) -> Result<PushPermission>;

    /// Ensure the background delivery endpoint is registered and ready.
    async fn ensure_endpoint(&self) -> Result<()>;

    /// Create a push registration keyed to the application server key
    /// (raw 65-byte uncompressed P-256 point).
    async fn create_registration(&self, server_key: &[u8]) -> Result<PushRegistration>;

    /// Drop the local registration. `Ok(false)` when none existed, which
    /// is not an error.
    async fn drop_registration(&self) -> Result<bool>;
}

/// Platform stub for surfaces with no push capability (e.g. the CLI).
/// All operations report unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

#[async_trait]
impl PushPlatform for UnsupportedPlatform {
    fn is_supported(&self) -> bool {
        false
    }

    fn permission(&self) -> PushPermission {
        PushPermission::Default
    }

    async fn request_permission(&self) -> Result<PushPermission> {
        Err(Error::Unsupported)
    }

    async fn ensure_endpoint(&self) -> Result<()> {
        Err(Error::Unsupported)
    }

    async fn create_registration(&self, _server_key: &[u8]) -> Result<PushRegistration> {
        Err(Error::Unsupported)
    }

    async fn drop_registration(&self) -> Result<bool> {
        Err(Error::Unsupported)
    }
}

/// Owner of the process-wide push subscription state.
pub struct PushManager {
    platform: Arc<dyn PushPlatform>,
    api: Arc<dyn NotificationApi>,
    session: Arc<SessionManager>,
    tx: watch::Sender<PushState>,
}

impl std::fmt::Debug for PushManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushManager")
            .field("state", &*self.tx.borrow())
            .finish_non_exhaustive()
    }
}

impl PushManager {
    /// Create a manager, probing platform capability once.
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        api: Arc<dyn NotificationApi>,
        session: Arc<SessionManager>,
    ) -> Self {
        let supported = platform.is_supported();
        let permission = if supported {
            platform.permission()
        } else {
            PushPermission::Default
        };
        if !supported {
            log::debug!("[Push] Platform does not support push notifications");
        }
        let (tx, _rx) = watch::channel(PushState {
            supported,
            permission,
            subscribed: false,
            loading: false,
        });
        Self {
            platform,
            api,
            session,
            tx,
        }
    }

    /// Current push state snapshot.
    pub fn state(&self) -> PushState {
        self.tx.borrow().clone()
    }

    /// Observe push state changes.
    pub fn watch(&self) -> watch::Receiver<PushState> {
        self.tx.subscribe()
    }

    /// Refresh `subscribed` from the notification service.
    ///
    /// Called whenever (token, premium) becomes available. Skipped without
    /// a network call when the gating condition is not met.
    pub async fn refresh_status(&self) -> Result<()> {
        if !self.tx.borrow().supported {
            return Ok(());
        }
        let Ok(token) = self.gate() else {
            log::debug!("[Push] Session not premium, skipping status refresh");
            return Ok(());
        };

        let subscribed = self.api.status(&token).await?;
        self.tx.send_modify(|s| s.subscribed = subscribed);
        log::debug!("[Push] Subscription status refreshed: {subscribed}");
        Ok(())
    }

    /// Run the full subscribe sequence.
    ///
    /// Requires platform support, a signed-in session and the premium
    /// entitlement; violations are rejected synchronously with zero
    /// network calls. Permission → delivery endpoint → server key →
    /// platform registration → backend submission; any failure aborts the
    /// remainder.
    pub async fn subscribe(&self) -> Result<()> {
        if !self.tx.borrow().supported {
            return Err(Error::Unsupported);
        }
        let token = self.gate()?;
        self.claim_loading()?;
        let _release = scopeguard::guard((), |()| self.release_loading());

        let permission = self.platform.request_permission().await?;
        self.tx.send_modify(|s| s.permission = permission);
        if permission != PushPermission::Granted {
            log::info!("[Push] Notification permission {permission}, aborting subscribe");
            return Err(Error::PermissionDenied);
        }

        self.platform.ensure_endpoint().await?;

        let key_b64 = self.api.public_key().await?;
        let server_key = decode_server_key(&key_b64)?;

        let registration = self.platform.create_registration(&server_key).await?;
        self.api.submit_subscription(&token, &registration).await?;

        self.tx.send_modify(|s| s.subscribed = true);
        log::info!("[Push] Subscribed");
        Ok(())
    }

    /// Tear down the subscription.
    ///
    /// Tolerates an already-absent platform registration; the notification
    /// service is always told about the removal, and `subscribed` is
    /// cleared once it acknowledges.
    pub async fn unsubscribe(&self) -> Result<()> {
        if !self.tx.borrow().supported {
            return Err(Error::Unsupported);
        }
        let Some(token) = self.session.session().token else {
            return Err(Error::CapabilityDenied("signed-in session required"));
        };
        self.claim_loading()?;
        let _release = scopeguard::guard((), |()| self.release_loading());

        if self.platform.drop_registration().await? {
            log::debug!("[Push] Platform registration removed");
        } else {
            log::debug!("[Push] No platform registration to remove");
        }

        self.api.remove_subscription(&token).await?;
        self.tx.send_modify(|s| s.subscribed = false);
        log::info!("[Push] Unsubscribed");
        Ok(())
    }

    /// Ask the notification service to deliver a test message to this
    /// account. Meaningful while subscribed but not hard-blocked on it.
    pub async fn send_test(&self) -> Result<()> {
        if !self.tx.borrow().supported {
            return Err(Error::Unsupported);
        }
        let Some(token) = self.session.session().token else {
            return Err(Error::CapabilityDenied("signed-in session required"));
        };
        self.api.send_test(&token).await
    }

    /// Token for a signed-in premium session, rejecting otherwise.
    ///
    /// Uses the same derived capability as the access gate so the two can
    /// never disagree about entitlement.
    fn gate(&self) -> Result<String> {
        let session = self.session.session();
        match (session.token.clone(), capability(&session)) {
            (Some(token), Capability::Premium) => Ok(token),
            (Some(_), _) => Err(Error::CapabilityDenied("premium subscription required")),
            (None, _) => Err(Error::CapabilityDenied("signed-in session required")),
        }
    }

    /// Atomically claim the loading flag, rejecting when already held.
    fn claim_loading(&self) -> Result<()> {
        let mut claimed = false;
        self.tx.send_if_modified(|s| {
            if s.loading {
                false
            } else {
                s.loading = true;
                claimed = true;
                true
            }
        });
        if claimed {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    fn release_loading(&self) {
        self.tx.send_modify(|s| s.loading = false);
    }
}

/// Decode the application server key from its base64url transport form.
///
/// Tolerates padded input. The key must be a 65-byte uncompressed P-256
/// point (leading 0x04).
fn decode_server_key(key_b64: &str) -> Result<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(key_b64.trim_end_matches('='))
        .map_err(|e| Error::Transient(format!("Invalid server key encoding: {e}")))?;
    if bytes.len() != 65 || bytes[0] != 0x04 {
        return Err(Error::Transient(format!(
            "Server key must be a 65-byte uncompressed P-256 point, got {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}
