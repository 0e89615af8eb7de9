//! Crate-wide error taxonomy.
//!
//! Every failure in this core degrades to a well-defined state (anonymous,
//! unsubscribed, or non-premium); none is fatal to the process. The variants
//! here classify failures so callers can pick the right user-facing message
//! and so polling loops can tell non-terminal hiccups from terminal results.

use std::fmt;

/// Errors surfaced by the session, push and entitlement components.
#[derive(Debug)]
pub enum Error {
    /// A credential was refused by the account service (login, register,
    /// OAuth exchange or hydration). The session is reset to anonymous.
    CredentialRejected(String),
    /// An operation requiring a signed-in or premium session was attempted
    /// without the entitlement. Rejected before any network call.
    CapabilityDenied(&'static str),
    /// The platform declined the notification permission prompt.
    PermissionDenied,
    /// Push notifications are not available on this platform.
    Unsupported,
    /// A subscribe or unsubscribe is already in flight.
    Busy,
    /// The checkout session expired before payment settled.
    SessionExpired,
    /// Network-level or backend hiccup; safe to retry.
    Transient(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialRejected(msg) => write!(f, "Credential rejected: {msg}"),
            Self::CapabilityDenied(what) => write!(f, "Capability denied: {what}"),
            Self::PermissionDenied => write!(f, "Notification permission denied"),
            Self::Unsupported => write!(f, "Push notifications not supported on this platform"),
            Self::Busy => write!(f, "A subscription change is already in progress"),
            Self::SessionExpired => write!(f, "Checkout session expired"),
            Self::Transient(msg) => write!(f, "Request failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether the failure is non-terminal for a retry/poll loop.
    ///
    /// Only network-level hiccups qualify; everything else is a decision,
    /// not an outage.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
