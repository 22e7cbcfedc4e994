use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::identity::{Credentials, Identity};

/// Everything a client keeps between page mounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default, rename = "user")]
    pub identity: Option<Identity>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Credential store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client-side persistence for tokens and the cached identity.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<StoredSession, StoreError>;

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError>;

    async fn save_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<StoredSession>,
}

impl MemoryCredentialStore {
    pub fn new(session: StoredSession) -> Self {
        Self { inner: RwLock::new(session) }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<StoredSession, StoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.inner.write().await.credentials = credentials.clone();
        Ok(())
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.inner.write().await.identity = Some(identity.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.inner.write().await = StoredSession::default();
        Ok(())
    }
}

/// JSON file store used by the CLI, one file per config directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn write(&self, session: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| self.io_error(e))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<StoredSession, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredSession::default()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let mut session = self.load().await?;
        session.credentials = credentials.clone();
        self.write(&session).await
    }

    async fn save_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut session = self.load().await?;
        session.identity = Some(identity.clone());
        self.write(&session).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
