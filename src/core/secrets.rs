//! Secret lookup for Titan.
//!
//! A secret name such as `github_token` is resolved in order from:
//! 1. the process environment (`GITHUB_TOKEN`)
//! 2. the project file `.titan/secrets.env`
//! 3. the system keychain (feature `secrets`)
//!
//! Values are never logged and are zeroed on drop when the `secrets`
//! feature is enabled.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "secrets")]
use keyring::Entry;
#[cfg(feature = "secrets")]
use zeroize::Zeroize;

use super::config::TITAN_DIR;

/// The service name used for keychain entries.
const SERVICE_NAME: &str = "titan";

/// Project secrets file inside [`TITAN_DIR`].
pub const SECRETS_FILE: &str = "secrets.env";

/// Errors that can occur during secrets operations.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Failed to access system keychain: {0}")]
    KeychainAccess(String),

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Failed to store secret: {0}")]
    StoreFailed(String),

    #[error("Failed to delete secret: {0}")]
    DeleteFailed(String),

    #[error("Secrets feature not available - compile with 'secrets' feature")]
    FeatureNotAvailable,
}

/// A secret value that is zeroed on drop.
#[cfg(feature = "secrets")]
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue {
    value: String,
}

#[cfg(not(feature = "secrets"))]
#[derive(Clone)]
pub struct SecretValue {
    value: String,
}

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// The raw value. Never log it.
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretValue([REDACTED])")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Layered secret lookup.
pub struct SecretStore {
    service: String,
    use_env: bool,
    use_keychain: bool,
    project_file: Option<PathBuf>,
    overrides: HashMap<String, SecretValue>,
}

impl SecretStore {
    /// Store for a project rooted at `project_dir`.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            use_env: true,
            use_keychain: true,
            project_file: Some(project_dir.join(TITAN_DIR).join(SECRETS_FILE)),
            overrides: HashMap::new(),
        }
    }

    /// Store that only knows values added with [`SecretStore::with_value`].
    pub fn isolated() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            use_env: false,
            use_keychain: false,
            project_file: None,
            overrides: HashMap::new(),
        }
    }

    /// Add a value that takes precedence over every other source.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), SecretValue::new(value));
        self
    }

    /// Resolve a secret by name.
    pub fn get(&self, name: &str) -> Option<SecretValue> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }

        let env_name = name.to_uppercase();

        if self.use_env {
            if let Ok(value) = std::env::var(&env_name) {
                if !value.is_empty() {
                    return Some(SecretValue::new(value));
                }
            }
        }

        if let Some(value) = self.project_file.as_deref().and_then(|p| read_env_file(p, name, &env_name)) {
            return Some(value);
        }

        if self.use_keychain {
            match self.keychain_get(name) {
                Ok(value) => return Some(value),
                Err(SecretsError::NotFound(_) | SecretsError::FeatureNotAvailable) => {}
                Err(e) => tracing::debug!(secret = name, error = %e, "Keychain lookup failed"),
            }
        }

        None
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Store a secret in the system keychain.
    pub fn set(&self, name: &str, value: &SecretValue) -> Result<(), SecretsError> {
        self.keychain_set(name, value)
    }

    /// Remove a secret from the system keychain.
    pub fn delete(&self, name: &str) -> Result<(), SecretsError> {
        self.keychain_delete(name)
    }

    #[cfg(feature = "secrets")]
    fn keychain_get(&self, name: &str) -> Result<SecretValue, SecretsError> {
        let entry = Entry::new(&self.service, name)
            .map_err(|e| SecretsError::KeychainAccess(e.to_string()))?;

        match entry.get_password() {
            Ok(password) => Ok(SecretValue::new(password)),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound(name.to_string())),
            Err(e) => Err(SecretsError::KeychainAccess(e.to_string())),
        }
    }

    #[cfg(not(feature = "secrets"))]
    fn keychain_get(&self, _name: &str) -> Result<SecretValue, SecretsError> {
        Err(SecretsError::FeatureNotAvailable)
    }

    #[cfg(feature = "secrets")]
    fn keychain_set(&self, name: &str, value: &SecretValue) -> Result<(), SecretsError> {
        let entry = Entry::new(&self.service, name)
            .map_err(|e| SecretsError::KeychainAccess(e.to_string()))?;

        entry.set_password(value.expose()).map_err(|e| SecretsError::StoreFailed(e.to_string()))
    }

    #[cfg(not(feature = "secrets"))]
    fn keychain_set(&self, _name: &str, _value: &SecretValue) -> Result<(), SecretsError> {
        Err(SecretsError::FeatureNotAvailable)
    }

    #[cfg(feature = "secrets")]
    fn keychain_delete(&self, name: &str) -> Result<(), SecretsError> {
        let entry = Entry::new(&self.service, name)
            .map_err(|e| SecretsError::KeychainAccess(e.to_string()))?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound(name.to_string())),
            Err(e) => Err(SecretsError::DeleteFailed(e.to_string())),
        }
    }

    #[cfg(not(feature = "secrets"))]
    fn keychain_delete(&self, _name: &str) -> Result<(), SecretsError> {
        Err(SecretsError::FeatureNotAvailable)
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("service", &self.service)
            .field("use_env", &self.use_env)
            .field("use_keychain", &self.use_keychain)
            .field("project_file", &self.project_file)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Look `name` up in a dotenv file, accepting either the given or the
/// upper-cased spelling.
fn read_env_file(path: &Path, name: &str, env_name: &str) -> Option<SecretValue> {
    let iter = dotenvy::from_path_iter(path).ok()?;
    for item in iter {
        match item {
            Ok((key, value)) if (key == name || key == env_name) && !value.is_empty() => {
                return Some(SecretValue::new(value));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed secrets file");
                return None;
            }
        }
    }
    None
}
