//! Persisted credential storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store keeps two keys outside process memory, `auth_token` and
//! `user_data`, so a signed-in session survives a restart. The pair is
//! written and cleared as one unit: [`FileStorage`] stores both keys in a
//! single JSON document and replaces it with an atomic rename, so a reader
//! never sees one key without the other unless the file was edited by hand.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("session file is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Raw contents of the persisted keys.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

impl StoredSession {
    #[must_use]
    pub fn new(auth_token: &str, user_data: &str) -> Self {
        Self { auth_token: Some(auth_token.to_owned()), user_data: Some(user_data.to_owned()) }
    }

    /// Both keys, if both are present and non-empty.
    #[must_use]
    pub fn complete(&self) -> Option<(&str, &str)> {
        let token = self.auth_token.as_deref().filter(|t| !t.is_empty())?;
        let user_data = self.user_data.as_deref().filter(|u| !u.is_empty())?;
        Some((token, user_data))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auth_token.is_none() && self.user_data.is_none()
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field(AUTH_TOKEN_KEY, &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field(USER_DATA_KEY, &self.user_data)
            .finish()
    }
}

/// Storage backend for the persisted session keys.
pub trait SessionStorage: Send + Sync {
    /// Read both keys. A missing store reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    fn load(&self) -> Result<StoredSession, StorageError>;

    /// Write both keys in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the previous contents remain.
    fn save(&self, auth_token: &str, user_data: &str) -> Result<(), StorageError>;

    /// Remove both keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be removed.
    fn clear(&self) -> Result<(), StorageError>;
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// Session keys kept in `<state_dir>/session.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn in_dir(state_dir: &Path) -> Self {
        Self { path: state_dir.join(SESSION_FILE) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<StoredSession, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredSession::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(StoredSession::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, auth_token: &str, user_data: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(&StoredSession::new(auth_token, user_data))?;

        let tmp_path = self.temp_path();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut tmp_file = options.open(&tmp_path)?;
        tmp_file.write_all(&content)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// Process-local storage for `--ephemeral` runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<StoredSession>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with arbitrary key contents, including a torn pair.
    #[must_use]
    pub fn with_contents(contents: StoredSession) -> Self {
        Self { inner: Mutex::new(contents) }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<StoredSession, StorageError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, auth_token: &str, user_data: &str) -> Result<(), StorageError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = StoredSession::new(auth_token, user_data);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = StoredSession::default();
        Ok(())
    }
}
