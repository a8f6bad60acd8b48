use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable storage for the access/refresh token pair.
///
/// Reads never fail: unreadable storage is reported as "no token".
/// `clear` always removes both tokens.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn store_pair(&self, access: &str, refresh: &str) -> Result<(), SessionError>;
    fn store_access(&self, access: &str) -> Result<(), SessionError>;
    fn clear(&self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(rename = "access_token", default, skip_serializing_if = "Option::is_none")]
    access: Option<String>,
    #[serde(rename = "refresh_token", default, skip_serializing_if = "Option::is_none")]
    refresh: Option<String>,
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            tokens: Mutex::new(StoredTokens {
                access: access.map(str::to_string),
                refresh: refresh.map(str::to_string),
            }),
        }
    }

    fn read(&self) -> StoredTokens {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut StoredTokens)) {
        let mut guard = self
            .tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.read().access
    }

    fn refresh_token(&self) -> Option<String> {
        self.read().refresh
    }

    fn store_pair(&self, access: &str, refresh: &str) -> Result<(), SessionError> {
        self.update(|tokens| {
            tokens.access = Some(access.to_string());
            tokens.refresh = Some(refresh.to_string());
        });
        Ok(())
    }

    fn store_access(&self, access: &str) -> Result<(), SessionError> {
        self.update(|tokens| tokens.access = Some(access.to_string()));
        Ok(())
    }

    fn clear(&self) {
        self.update(|tokens| *tokens = StoredTokens::default());
    }
}

/// Token store persisted as a small JSON document on disk.
///
/// Writes go to a sibling temp file and are renamed into place, so a reader
/// never observes one token without the other.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> StoredTokens {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoredTokens::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                return StoredTokens::default();
            }
        };

        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt token file");
            StoredTokens::default()
        })
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::StorageFailure(e.to_string()))?;
        }

        let body =
            serde_json::to_vec(tokens).map_err(|e| SessionError::StorageFailure(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| SessionError::StorageFailure(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| SessionError::StorageFailure(e.to_string()))
    }

    fn modify(&self, f: impl FnOnce(&mut StoredTokens)) -> Result<(), SessionError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut tokens = self.load();
        f(&mut tokens);
        self.persist(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.load().access
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh
    }

    fn store_pair(&self, access: &str, refresh: &str) -> Result<(), SessionError> {
        self.modify(|tokens| {
            tokens.access = Some(access.to_string());
            tokens.refresh = Some(refresh.to_string());
        })
    }

    fn store_access(&self, access: &str) -> Result<(), SessionError> {
        self.modify(|tokens| tokens.access = Some(access.to_string()))
    }

    fn clear(&self) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to remove token file");
                // Leave an empty document behind so no stale token is read back
                if let Err(e) = std::fs::write(&self.path, b"{}") {
                    tracing::error!(error = %e, "Failed to blank token file");
                }
            }
        }
    }
}
