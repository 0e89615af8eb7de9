//! Federated sign-in callback handling.
//!
//! When the app loads with a fragment-style `session_id` parameter, the
//! one-time id is exchanged for a session credential and the visitor is
//! routed onward. The triggering surface (a mount/redirect event) may fire
//! more than once for the same inbound URL, so each session id is consumed
//! exactly once; later invocations are no-ops.
//!
//! A failed exchange is terminal for that redirect: the handler never
//! retries, the user restarts federation from the sign-in page.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::access::SIGN_IN_ROUTE;
use crate::session::SessionManager;

/// Default destination after a successful federated sign-in.
pub const LANDING_ROUTE: &str = "/bible";

/// Where to route after processing an inbound callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Exchange succeeded; continue to the signed-in landing destination.
    SignedIn {
        /// Route to navigate to.
        destination: &'static str,
    },
    /// The inbound fragment carried no session id; go sign in.
    MissingSession {
        /// Route to navigate to.
        destination: &'static str,
    },
    /// The exchange was refused or failed; show a transient notice and go
    /// sign in.
    Failed {
        /// Route to navigate to.
        destination: &'static str,
        /// User-facing failure notice.
        notice: String,
    },
    /// This session id was already consumed by an earlier invocation.
    AlreadyHandled,
}

/// One-shot processor for federated sign-in redirects.
pub struct OAuthCallback {
    session: Arc<SessionManager>,
    consumed: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for OAuthCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCallback").finish_non_exhaustive()
    }
}

impl OAuthCallback {
    /// Create a handler bound to the session manager.
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            consumed: Mutex::new(HashSet::new()),
        }
    }

    /// Process an inbound redirect given the URL fragment.
    ///
    /// The session id is claimed before the exchange is attempted, so a
    /// re-entrant invocation for the same redirect occurrence performs
    /// zero account service calls.
    pub async fn handle(&self, fragment: &str) -> CallbackOutcome {
        let Some(session_id) = parse_session_id(fragment) else {
            log::warn!("Sign-in callback without session_id, redirecting to sign-in");
            return CallbackOutcome::MissingSession {
                destination: SIGN_IN_ROUTE,
            };
        };

        {
            let mut consumed = match self.consumed.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !consumed.insert(session_id.clone()) {
                log::debug!("Sign-in callback already handled for this session id");
                return CallbackOutcome::AlreadyHandled;
            }
        }

        match self.session.exchange_oauth_session(&session_id).await {
            Ok(response) => {
                log::info!("Federated sign-in completed for {}", response.user.email);
                CallbackOutcome::SignedIn {
                    destination: LANDING_ROUTE,
                }
            }
            Err(err) => {
                log::warn!("Federated sign-in failed: {err}");
                CallbackOutcome::Failed {
                    destination: SIGN_IN_ROUTE,
                    notice: "Authentication failed. Please try again.".to_string(),
                }
            }
        }
    }
}

/// Extract the `session_id` parameter from a URL fragment such as
/// `#session_id=abc&state=xyz`. Returns `None` when absent or empty.
pub fn parse_session_id(fragment: &str) -> Option<String> {
    fragment
        .trim_start_matches('#')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "session_id")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
