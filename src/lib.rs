//! Berean client core - session, entitlement and push subscription state.
//!
//! This crate is the client-resident core of the Berean scripture study
//! app: it establishes who the current user is, what capability tier they
//! hold (anonymous, authenticated, premium), and keeps that classification
//! consistent across navigation, federated sign-in and asynchronous
//! payment confirmation. It also manages the opt-in push-notification
//! subscription gated by the same entitlement state.
//!
//! # Architecture
//!
//! The crate follows a centralized state store pattern:
//!
//! - **SessionManager** - owns identity state, publishes snapshots
//! - **Access gate** - pure route decisions over session snapshots
//! - **OAuthCallback** - one-shot federated sign-in redirect processor
//! - **PushManager** - push subscription state machine
//! - **EntitlementPoller** - bounded checkout settlement polling
//! - **api** - HTTP adapters for the backend service collaborators
//!
//! Content retrieval, checkout, token issuance and push delivery are
//! external collaborators consumed through the `api` traits; this core
//! treats tokens as opaque bearer credentials.
//!
//! # Modules
//!
//! - [`session`] - session lifecycle and identity state
//! - [`access`] - capability-gated route decisions
//! - [`oauth`] - federated sign-in callback handling
//! - [`push`] - push subscription lifecycle
//! - [`entitlement`] - payment confirmation polling
//! - [`api`] - backend service clients
//! - [`config`] - configuration loading/saving
//! - [`credentials`] - durable bearer token storage

// Library modules
pub mod access;
pub mod api;
pub mod config;
pub mod credentials;
pub mod entitlement;
pub mod env;
pub mod error;
pub mod oauth;
pub mod push;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use access::{authenticated_route, capability, premium_route, Capability, GateDecision};
pub use api::types::{AuthResponse, PushRegistration, User, UserPatch};
pub use config::Config;
pub use credentials::CredentialStore;
pub use entitlement::{CheckoutOutcome, EntitlementPoller};
pub use error::{Error, Result};
pub use oauth::{CallbackOutcome, OAuthCallback};
pub use push::{PushManager, PushPermission, PushPlatform, PushState, UnsupportedPlatform};
pub use session::{Session, SessionManager};
