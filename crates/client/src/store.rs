//! Token storage.
//!
//! A [`TokenStore`] is the single durable slot for the current credentials.
//! Stores never fail: an unreadable or unwritable backing file is logged and
//! the in-memory copy stays authoritative for the life of the process.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::persist;
use crate::token::{AccessToken, RefreshToken, StoredTokens};

/// Durable slot holding at most one set of credentials.
pub trait TokenStore: Send + Sync {
    /// The current credentials, if any.
    fn get(&self) -> Option<StoredTokens>;

    /// Replace the current credentials.
    fn set(&self, tokens: StoredTokens);

    /// Forget the current credentials.
    fn clear(&self);
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<StoredTokens>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `tokens`.
    #[must_use]
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            slot: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<StoredTokens> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, tokens: StoredTokens) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
    }

    fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// On-disk shape of `credentials.json`.
#[derive(Serialize, Deserialize)]
struct CredentialsFile {
    /// API origin the tokens were issued by.
    origin: String,
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    issued_at: DateTime<Utc>,
}

/// Store backed by an owner-only JSON file.
///
/// The file is read once when the store is opened; afterwards reads are served
/// from memory and every write goes through to disk. Credentials recorded for
/// a different API origin are ignored, so tokens are never presented to a
/// backend that did not issue them.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    origin: String,
    cache: MemoryTokenStore,
}

impl FileTokenStore {
    /// Open the store at `path` for the API at `origin`.
    pub fn open(path: impl Into<PathBuf>, origin: impl Into<String>) -> Self {
        let path = path.into();
        let origin = origin.into();

        let initial = match persist::read_json::<CredentialsFile>(&path) {
            Ok(Some(file)) if file.origin == origin => Some(StoredTokens {
                access_token: AccessToken::new(file.access_token),
                refresh_token: file.refresh_token.map(RefreshToken::new),
                issued_at: file.issued_at,
            }),
            Ok(Some(file)) => {
                tracing::warn!(
                    path = %path.display(),
                    stored_origin = %file.origin,
                    origin = %origin,
                    "Ignoring credentials issued for a different API origin"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read credentials");
                None
            }
        };

        let cache = initial.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens);
        Self {
            path,
            origin,
            cache,
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<StoredTokens> {
        self.cache.get()
    }

    fn set(&self, tokens: StoredTokens) {
        let file = CredentialsFile {
            origin: self.origin.clone(),
            access_token: tokens.access_token.expose_secret().to_owned(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_owned()),
            issued_at: tokens.issued_at,
        };
        if let Err(e) = persist::write_json(&self.path, &file) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist credentials"
            );
        }
        self.cache.set(tokens);
    }

    fn clear(&self) {
        if let Err(e) = persist::remove(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove credentials");
        }
        self.cache.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORIGIN: &str = "http://localhost:9191";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("stns-store-{}-{name}", uuid::Uuid::new_v4()))
            .join("credentials.json")
    }

    fn tokens(access: &str) -> StoredTokens {
        StoredTokens::new(AccessToken::new(access), Some(RefreshToken::new("refresh")))
    }

    #[test]
    fn test_memory_store_returns_last_set() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        store.set(tokens("one"));
        store.set(tokens("two"));
        assert_eq!(store.get().unwrap().access_token, AccessToken::new("two"));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path("reopen");
        let store = FileTokenStore::open(&path, ORIGIN);
        store.set(tokens("persisted"));

        let reopened = FileTokenStore::open(&path, ORIGIN);
        let loaded = reopened.get().unwrap();
        assert_eq!(loaded.access_token, AccessToken::new("persisted"));
        assert_eq!(loaded.refresh_token, Some(RefreshToken::new("refresh")));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let path = temp_path("clear");
        let store = FileTokenStore::open(&path, ORIGIN);
        store.set(tokens("gone-soon"));
        store.clear();

        assert!(store.get().is_none());
        assert!(!path.exists());
        assert!(FileTokenStore::open(&path, ORIGIN).get().is_none());
    }

    #[test]
    fn test_file_store_ignores_other_origin() {
        let path = temp_path("origin");
        FileTokenStore::open(&path, ORIGIN).set(tokens("local"));

        let other = FileTokenStore::open(&path, "https://evil.example");
        assert!(other.get().is_none());
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileTokenStore::open(&path, ORIGIN);
        assert!(store.get().is_none());

        store.set(tokens("fresh"));
        assert_eq!(
            FileTokenStore::open(&path, ORIGIN).get().unwrap().access_token,
            AccessToken::new("fresh")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("mode");
        FileTokenStore::open(&path, ORIGIN).set(tokens("private"));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
