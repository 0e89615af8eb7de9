//! Durable storage for the session bearer token.
//!
//! Stores the single opaque credential in one OS keyring entry so the token
//! survives process restarts without ever touching the config file.
//!
//! # Storage
//!
//! Production: single keyring entry `berean/credentials` containing JSON.
//! Test mode (`BEREAN_ENV=test` or unit tests): file at
//! `{config_dir}/credentials.json`, mode 0600.
//!
//! # Graceful Degradation
//!
//! Keyring access can fail transiently (locked keychain, binary signature
//! change on macOS). Loads retry and then fall back to an empty credential
//! set, which the session layer treats as "anonymous until re-auth".
//! Only the session manager writes here; reads happen once at hydration.

use anyhow::Result;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Keyring service name.
const KEYRING_SERVICE: &str = "berean";
/// Consolidated keyring entry name.
const KEYRING_CREDENTIALS: &str = "credentials";

/// Number of retry attempts for keyring access.
const KEYRING_RETRY_ATTEMPTS: u32 = 2;
/// Delay between retry attempts in milliseconds.
const KEYRING_RETRY_DELAY_MS: u64 = 500;

/// Categorized keyring access errors for better user feedback.
#[derive(Debug)]
pub enum CredentialAccessError {
    /// Keyring is locked and requires user interaction to unlock.
    Locked(String),
    /// Entry does not exist (normal for first run).
    NotFound,
    /// Access denied, likely due to binary signature change.
    AccessDenied(String),
    /// Data exists but is corrupted or unparseable.
    Corrupted(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for CredentialAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(msg) => write!(f, "Keyring locked: {msg}"),
            Self::NotFound => write!(f, "Keyring entry not found"),
            Self::AccessDenied(msg) => write!(f, "Keyring access denied: {msg}"),
            Self::Corrupted(msg) => write!(f, "Stored credential corrupted: {msg}"),
            Self::Other(msg) => write!(f, "Keyring error: {msg}"),
        }
    }
}

impl std::error::Error for CredentialAccessError {}

/// Categorize a keyring error for better user feedback.
fn categorize_keyring_error(err: &keyring::Error) -> CredentialAccessError {
    let msg = format!("{err:?}");
    let msg_lower = msg.to_lowercase();

    if msg_lower.contains("no password")
        || msg_lower.contains("not found")
        || msg_lower.contains("nopassword")
    {
        return CredentialAccessError::NotFound;
    }

    if msg_lower.contains("user interaction") || msg_lower.contains("user canceled") {
        return CredentialAccessError::Locked(msg);
    }

    if msg_lower.contains("denied")
        || msg_lower.contains("codesign")
        || msg_lower.contains("authorization")
        || msg_lower.contains("not allowed")
    {
        return CredentialAccessError::AccessDenied(msg);
    }

    CredentialAccessError::Other(msg)
}

/// On-disk / in-keyring shape of the persisted credential.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct StoredCredentials {
    /// Opaque session bearer token. Never interpreted client-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,

    /// Schema version for future migrations.
    #[serde(default = "default_version")]
    version: u8,
}

fn default_version() -> u8 {
    1
}

/// Where the credential physically lives.
#[derive(Debug, Clone)]
enum Backend {
    /// OS keyring (production).
    Keyring,
    /// Plain file (tests, `BEREAN_ENV=test`).
    File(PathBuf),
}

/// Durable, process-independent store for the session bearer token.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: Backend,
}

impl CredentialStore {
    /// Create a store using the default backend for the current environment:
    /// OS keyring in production, a file under the config dir in test mode.
    pub fn open() -> Result<Self> {
        if crate::env::should_skip_keyring() {
            let path = crate::config::Config::config_dir()?.join("credentials.json");
            return Ok(Self::file_backed(path));
        }
        Ok(Self {
            backend: Backend::Keyring,
        })
    }

    /// Create a store backed by an explicit file path.
    ///
    /// Used by tests to stay hermetic; behaves identically to the test-mode
    /// fallback of [`CredentialStore::open`].
    pub fn file_backed(path: PathBuf) -> Self {
        Self {
            backend: Backend::File(path),
        }
    }

    /// Load the persisted token, if any.
    ///
    /// Never fails: transient keyring trouble is retried, then degrades to
    /// `None` so the app can continue anonymously and re-authenticate.
    pub fn load_token(&self) -> Option<String> {
        match &self.backend {
            Backend::File(path) => Self::load_from_file(path).token,
            Backend::Keyring => Self::load_from_keyring_with_retry().token,
        }
    }

    /// Persist the token, replacing any previous credential.
    pub fn save_token(&self, token: &str) -> Result<()> {
        let creds = StoredCredentials {
            token: Some(token.to_string()),
            version: default_version(),
        };
        match &self.backend {
            Backend::File(path) => Self::save_to_file(path, &creds),
            Backend::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
                    .map_err(|e| anyhow::anyhow!("Failed to create keyring entry: {e:?}"))?;
                let json = serde_json::to_string(&creds)?;
                entry
                    .set_password(&json)
                    .map_err(|e| anyhow::anyhow!("Failed to store credential in keyring: {e:?}"))?;
                log::info!("Saved session credential to OS keyring");
                Ok(())
            }
        }
    }

    /// Erase the persisted credential, if present.
    pub fn clear(&self) -> Result<()> {
        match &self.backend {
            Backend::File(path) => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
                Ok(())
            }
            Backend::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
                    .map_err(|e| anyhow::anyhow!("Failed to create keyring entry: {e:?}"))?;
                let _ = entry.delete_credential();
                log::info!("Deleted session credential from OS keyring");
                Ok(())
            }
        }
    }

    /// Load from keyring with retry logic for transient failures.
    fn load_from_keyring_with_retry() -> StoredCredentials {
        let mut last_error: Option<CredentialAccessError> = None;

        for attempt in 0..KEYRING_RETRY_ATTEMPTS {
            if attempt > 0 {
                log::debug!(
                    "Retrying keyring access (attempt {}/{})",
                    attempt + 1,
                    KEYRING_RETRY_ATTEMPTS
                );
                thread::sleep(Duration::from_millis(KEYRING_RETRY_DELAY_MS));
            }

            match Self::try_load_from_keyring() {
                Ok(creds) => return creds,
                Err(err) => {
                    log::debug!("Keyring access attempt {} failed: {}", attempt + 1, err);

                    // NotFound is expected on first run, don't retry
                    if matches!(err, CredentialAccessError::NotFound) {
                        return StoredCredentials::default();
                    }

                    // Corrupted data won't fix itself
                    if matches!(err, CredentialAccessError::Corrupted(_)) {
                        log::warn!("Stored credential corrupted, treating as absent: {err}");
                        return StoredCredentials::default();
                    }

                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = &last_error {
            log::warn!(
                "Keyring access failed after {} attempts: {}. Session will start anonymous.",
                KEYRING_RETRY_ATTEMPTS,
                err
            );
            if matches!(err, CredentialAccessError::AccessDenied(_)) {
                log::info!(
                    "Hint: Binary signature may have changed. \
                     You may need to sign in again or unlock your keychain."
                );
            }
        }

        StoredCredentials::default()
    }

    /// Attempt a single load from keyring, categorizing any errors.
    fn try_load_from_keyring() -> std::result::Result<StoredCredentials, CredentialAccessError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
            .map_err(|e| CredentialAccessError::Other(format!("Failed to create entry: {e:?}")))?;

        match entry.get_password() {
            Ok(json) => {
                let creds: StoredCredentials = serde_json::from_str(&json).map_err(|e| {
                    CredentialAccessError::Corrupted(format!("JSON parse error: {e}"))
                })?;
                log::debug!("Loaded session credential from keyring");
                Ok(creds)
            }
            Err(e) => Err(categorize_keyring_error(&e)),
        }
    }

    /// Load from file (test mode). Missing or unreadable file means no
    /// credential, mirroring the keyring degradation.
    fn load_from_file(path: &Path) -> StoredCredentials {
        if !path.exists() {
            log::debug!("No credentials file found, starting anonymous");
            return StoredCredentials::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(creds) => creds,
                Err(e) => {
                    log::warn!("Credentials file corrupted, treating as absent: {e}");
                    StoredCredentials::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read credentials file: {e}");
                StoredCredentials::default()
            }
        }
    }

    /// Save to file (test mode).
    fn save_to_file(path: &Path, creds: &StoredCredentials) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(creds)?;
        fs::write(path, json)?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        log::debug!("Saved session credential to file (test mode)");
        Ok(())
    }
}
