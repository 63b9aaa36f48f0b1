//! Durable credential storage.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::mutex_lock;

pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Access and refresh token pair. Always stored and cleared together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl StoredCredentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credential storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError>;
    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError>;
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Credentials kept in a single JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store rooted at `directory`; the directory is created on first save.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            path: directory.as_ref().join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(&self.path, err)),
        };
        let credentials =
            serde_json::from_slice(&bytes).map_err(|source| StorageError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(credentials))
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        let path = self.path.clone();
        let json = serde_json::to_vec_pretty(credentials).map_err(|source| {
            StorageError::Malformed {
                path: path.clone(),
                source,
            }
        })?;

        tokio::task::spawn_blocking(move || write_atomic(&path, &json)).await??;
        debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credentials cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io(&self.path, err)),
        }
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory).map_err(|err| StorageError::io(directory, err))?;

    let mut file =
        tempfile::NamedTempFile::new_in(directory).map_err(|err| StorageError::io(path, err))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|err| StorageError::io(path, err))?;
    file.persist(path)
        .map_err(|err| StorageError::io(path, err.error))?;
    Ok(())
}

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }

    pub fn snapshot(&self) -> Option<StoredCredentials> {
        mutex_lock(&self.credentials, "session::storage", "snapshot").clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>, StorageError> {
        Ok(self.snapshot())
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        *mutex_lock(&self.credentials, "session::storage", "save") = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *mutex_lock(&self.credentials, "session::storage", "clear") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(dir.path().join("nested"));
        assert!(store.load().await.expect("load").is_none());

        let credentials = StoredCredentials::new("access-1", "refresh-1");
        store.save(&credentials).await.expect("save");
        assert_eq!(store.load().await.expect("load"), Some(credentials));

        let replacement = StoredCredentials::new("access-2", "refresh-2");
        store.save(&replacement).await.expect("save again");
        assert_eq!(store.load().await.expect("load"), Some(replacement));

        store.clear().await.expect("clear");
        assert!(store.load().await.expect("load").is_none());
        assert!(!store.path().exists());
        store.clear().await.expect("clear is idempotent");
    }

    #[tokio::test]
    async fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCredentialStore::new(dir.path());
        std::fs::write(store.path(), b"{not json").expect("write");

        let err = store.load().await.expect_err("malformed");
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let rendered = format!("{:?}", StoredCredentials::new("secret-a", "secret-r"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn memory_store_clears_both_tokens() {
        let store = MemoryCredentialStore::with_credentials(StoredCredentials::new("a", "r"));
        store.clear().await.expect("clear");
        assert!(store.snapshot().is_none());
    }
}
