//! Durable slot for the bearer credential. The browser shell maps this onto
//! `localStorage`; native shells use [`FileTokenStore`], a JSON object keyed by
//! storage key that survives process restarts. Token values must never be logged.

use super::errors::SessionError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};
use tracing::{debug, warn};

/// Holds at most one bearer credential.
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Returns the stored credential, if any. Unreadable storage reads as empty.
    fn load(&self) -> Option<SecretString>;

    /// Replaces the stored credential.
    ///
    /// # Errors
    /// Returns `SessionError::Storage` if the value cannot be persisted.
    fn store(&self, token: SecretString) -> Result<(), SessionError>;

    /// Removes the stored credential; clearing an empty store succeeds.
    ///
    /// # Errors
    /// Returns `SessionError::Storage` if the backing storage cannot be updated.
    fn clear(&self) -> Result<(), SessionError>;
}

/// In-memory store, for tests and cookie-only deployments.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::from(token.into()))),
        }
    }
}

impl fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("MemoryTokenStore")
            .field("token", if present { &"***" } else { &"<none>" })
            .finish()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: SecretString) -> Result<(), SessionError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// File-backed store. The file is a JSON object so several storage keys (one
/// per app or origin) can share it; other keys are preserved on every write.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => {
                return Err(SessionError::Storage(format!(
                    "Failed to read {}: {err}",
                    self.path.display()
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) | Err(_) => Err(SessionError::Storage(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                SessionError::Storage(format!("Failed to create {}: {err}", parent.display()))
            })?;
        }

        let payload = serde_json::to_vec_pretty(entries)
            .map_err(|err| SessionError::Storage(format!("Failed to encode tokens: {err}")))?;

        // Write next to the target and rename so readers never see a partial file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload).map_err(|err| {
            SessionError::Storage(format!("Failed to write {}: {err}", tmp.display()))
        })?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            SessionError::Storage(format!("Failed to replace {}: {err}", self.path.display()))
        })
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<SecretString> {
        match self.read_entries() {
            Ok(entries) => entries
                .get(&self.key)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(|token| SecretString::from(token.to_string())),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable token store");
                None
            }
        }
    }

    fn store(&self, token: SecretString) -> Result<(), SessionError> {
        // A corrupt file is replaced rather than blocking login.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(
            self.key.clone(),
            Value::String(token.expose_secret().to_string()),
        );
        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), key = %self.key, "credential stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut entries = self.read_entries().unwrap_or_default();
        if entries.remove(&self.key).is_none() && self.path.exists() {
            return Ok(());
        }
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(SessionError::Storage(format!(
                    "Failed to remove {}: {err}",
                    self.path.display()
                ))),
            };
        }
        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), key = %self.key, "credential cleared");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|err| {
        SessionError::Storage(format!(
            "Failed to set permissions on {}: {err}",
            path.display()
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}
