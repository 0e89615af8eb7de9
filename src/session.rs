//! Session lifecycle and identity state.
//!
//! The `SessionManager` is the single owner of process-wide authentication
//! state. All mutation happens inside it; the rest of the app observes
//! snapshots through a `tokio::sync::watch` channel or the accessor
//! methods. The persisted credential is written only here.
//!
//! # Lifecycle
//!
//! The session starts empty with `loading = true`, is hydrated exactly once
//! from the credential store at startup, and is then mutated by
//! login/register/OAuth exchange (set user + token) or logout and failed
//! hydration (clear both and erase the persisted credential).
//!
//! # Invariant
//!
//! `user` is present iff `token` is present, except transiently while
//! `loading` is true before the first resolution.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::watch;

use crate::api::types::{AuthResponse, User, UserPatch};
use crate::api::AccountApi;
use crate::credentials::CredentialStore;
use crate::error::Result;

/// Process-wide authentication state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The signed-in user; absent means anonymous.
    pub user: Option<User>,
    /// Opaque bearer credential; present iff a credential has been
    /// established and not yet invalidated.
    pub token: Option<String>,
    /// True only during initial hydration. Gate decisions must treat this
    /// as "deferred", never as "anonymous".
    pub loading: bool,
}

impl Session {
    /// The empty pre-hydration state.
    fn initial() -> Self {
        Self {
            user: None,
            token: None,
            loading: true,
        }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether the signed-in user holds the premium entitlement.
    pub fn is_premium(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_premium)
    }
}

/// Owner of the process-wide session state.
///
/// Holds the account service client and the credential store; publishes
/// [`Session`] snapshots on every change.
pub struct SessionManager {
    account: Arc<dyn AccountApi>,
    store: CredentialStore,
    tx: watch::Sender<Session>,
    hydrated: AtomicBool,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.tx.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager in the empty pre-hydration state.
    pub fn new(account: Arc<dyn AccountApi>, store: CredentialStore) -> Self {
        let (tx, _rx) = watch::channel(Session::initial());
        Self {
            account,
            store,
            tx,
            hydrated: AtomicBool::new(false),
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Observe session changes. Every mutation publishes a new snapshot.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Reconstruct the session from the persisted credential.
    ///
    /// Runs exactly once per process lifetime; later calls are no-ops.
    /// Any failure (absent credential, network, rejection) leaves the
    /// session anonymous and erases the persisted credential, so a
    /// transient outage at boot costs a re-login, never a half-open
    /// session. `loading` is cleared on every path.
    pub async fn hydrate(&self) {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            log::debug!("Session already hydrated, skipping");
            return;
        }

        let Some(token) = self.store.load_token() else {
            log::debug!("No persisted credential, starting anonymous");
            self.tx.send_modify(|s| s.loading = false);
            return;
        };

        match self.account.who_am_i(&token).await {
            Ok(user) => {
                log::info!("Session hydrated for {}", user.email);
                self.tx.send_modify(|s| {
                    s.user = Some(user);
                    s.token = Some(token);
                    s.loading = false;
                });
            }
            Err(err) => {
                log::warn!("Session hydration failed, clearing credential: {err}");
                if let Err(e) = self.store.clear() {
                    log::warn!("Failed to erase persisted credential: {e}");
                }
                self.tx.send_modify(|s| {
                    s.user = None;
                    s.token = None;
                    s.loading = false;
                });
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// On success the token is persisted and the session updated. Failures
    /// propagate unchanged; the caller decides the user-facing message.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self.account.login(email, password).await?;
        self.establish(&response);
        Ok(response)
    }

    /// Create an account and sign in. Symmetric to [`SessionManager::login`].
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self.account.register(name, email, password).await?;
        self.establish(&response);
        Ok(response)
    }

    /// Exchange a one-time federated sign-in session id for a credential.
    ///
    /// Behaves like login on success. Re-entrancy for the same redirect is
    /// guarded one level up, in the OAuth callback handler.
    pub async fn exchange_oauth_session(&self, session_id: &str) -> Result<AuthResponse> {
        let response = self.account.exchange_session(session_id).await?;
        self.establish(&response);
        Ok(response)
    }

    /// Sign out.
    ///
    /// The backend call is best-effort: logout always succeeds locally.
    /// The persisted credential is erased and the session cleared
    /// unconditionally.
    pub async fn logout(&self) {
        let token = self.tx.borrow().token.clone();
        if let Some(token) = token {
            if let Err(err) = self.account.logout(&token).await {
                log::warn!("Backend logout failed (ignored): {err}");
            }
        }

        if let Err(e) = self.store.clear() {
            log::warn!("Failed to erase persisted credential: {e}");
        }
        self.tx.send_modify(|s| {
            s.user = None;
            s.token = None;
            s.loading = false;
        });
        log::info!("Signed out");
    }

    /// Merge fields into the in-memory user record without a network call.
    ///
    /// Used after out-of-band confirmation (e.g. a settled checkout).
    /// No-op while anonymous.
    pub fn update_user(&self, patch: &UserPatch) {
        self.tx.send_modify(|s| {
            if let Some(user) = s.user.as_mut() {
                if let Some(name) = &patch.name {
                    user.name = name.clone();
                }
                if let Some(picture) = &patch.picture {
                    user.picture = Some(picture.clone());
                }
                if let Some(is_premium) = patch.is_premium {
                    user.is_premium = is_premium;
                }
            }
        });
    }

    /// Bearer header map for outbound requests; empty when anonymous.
    /// Pure and synchronous.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.tx.borrow().token.as_deref() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Persist the credential and publish the signed-in state.
    fn establish(&self, response: &AuthResponse) {
        if let Err(err) = self.store.save_token(&response.token) {
            // The session still works in memory; it just won't survive a
            // restart.
            log::warn!("Failed to persist credential: {err}");
        }
        self.tx.send_modify(|s| {
            s.user = Some(response.user.clone());
            s.token = Some(response.token.clone());
            s.loading = false;
        });
    }
}
