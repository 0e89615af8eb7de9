//! Runtime environment detection.
//!
//! Provides a single source of truth for determining the runtime environment
//! (test, development, production) based on the `BEREAN_ENV` environment
//! variable. The main consumer is the credential store, which must never
//! touch the OS keyring during tests.
//!
//! # Environment Variable
//!
//! Set `BEREAN_ENV` to one of:
//! - `test` - Test mode (skips keyring, uses file storage)
//! - `development` or `dev` - Development mode
//! - (anything else or unset) - Production mode

/// Runtime environment for the client core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment (default).
    Production,
    /// Development environment.
    Development,
    /// Test environment - uses file storage instead of the OS keyring.
    Test,
}

impl Environment {
    /// Detect current environment from `BEREAN_ENV`.
    #[must_use]
    pub fn current() -> Self {
        match std::env::var("BEREAN_ENV").as_deref() {
            Ok("test") => Self::Test,
            Ok("development") | Ok("dev") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Returns `true` if this is the test environment.
    #[must_use]
    pub fn is_test(self) -> bool {
        self == Self::Test
    }

    /// Returns `true` if this is the production environment.
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Returns `true` if the OS keyring should be bypassed in favor of file
/// storage. True during unit tests and when `BEREAN_ENV=test`.
#[must_use]
pub fn should_skip_keyring() -> bool {
    #[cfg(test)]
    {
        true
    }

    #[cfg(not(test))]
    {
        Environment::current().is_test()
    }
}
