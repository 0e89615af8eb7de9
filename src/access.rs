//! Capability-gated route decisions.
//!
//! The capability tier is derived from the session at read time, never
//! cached, so the gate and the push manager can never disagree about
//! entitlement after it changes.
//!
//! Decision table, shared by both route variants:
//!
//! | session        | requires authenticated | requires premium |
//! |----------------|------------------------|------------------|
//! | hydrating      | loading                | loading          |
//! | anonymous      | redirect to sign-in    | redirect to sign-in |
//! | authenticated  | render                 | upgrade wall     |
//! | premium        | render                 | render           |
//!
//! The upgrade wall renders in place of the content rather than
//! redirecting, preserving the URL and browser history.

use crate::session::Session;

/// Route where anonymous visitors are sent to sign in.
pub const SIGN_IN_ROUTE: &str = "/login";

/// Capability tier derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    /// No user signed in.
    Anonymous,
    /// Signed in without the premium entitlement.
    Authenticated,
    /// Signed in with the premium entitlement.
    Premium,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

/// The capability tier of a session. Pure function of the snapshot.
pub fn capability(session: &Session) -> Capability {
    match &session.user {
        None => Capability::Anonymous,
        Some(user) if user.is_premium => Capability::Premium,
        Some(_) => Capability::Authenticated,
    }
}

/// What a protected destination should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Hydration has not resolved; render a neutral loading indicator and
    /// make no redirect decision yet.
    Loading,
    /// Send the visitor to sign-in, recording where they were headed.
    RedirectToSignIn {
        /// Destination to return to after sign-in.
        return_to: String,
    },
    /// Render an upgrade prompt in place of the content.
    UpgradeWall,
    /// Render the protected content.
    Render,
}

/// Shared decision table over (session, required tier, destination).
fn decide(session: &Session, required: Capability, destination: &str) -> GateDecision {
    if session.loading {
        return GateDecision::Loading;
    }
    let tier = capability(session);
    if tier >= required {
        return GateDecision::Render;
    }
    if tier == Capability::Anonymous {
        return GateDecision::RedirectToSignIn {
            return_to: destination.to_string(),
        };
    }
    GateDecision::UpgradeWall
}

/// Gate for destinations requiring a signed-in session.
pub fn authenticated_route(session: &Session, destination: &str) -> GateDecision {
    decide(session, Capability::Authenticated, destination)
}

/// Gate for destinations requiring the premium entitlement.
pub fn premium_route(session: &Session, destination: &str) -> GateDecision {
    decide(session, Capability::Premium, destination)
}
