use super::{CredentialStore, Credentials};
use crate::{error::StoreError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File holding the serialized credentials inside a session's auth directory.
pub const CREDS_FILE: &str = "creds.json";

/// Credential store backed by one directory per session (`auth/<session>/`).
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if it does not exist yet.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn creds_path(&self) -> PathBuf {
        self.dir.join(CREDS_FILE)
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        let raw = match tokio::fs::read(self.creds_path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Load(e.to_string()).into()),
        };
        let creds =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Load(e.to_string()))?;
        Ok(Some(creds))
    }

    async fn save(&self, creds: &Credentials) -> Result<()> {
        let raw =
            serde_json::to_vec_pretty(creds).map_err(|e| StoreError::Save(e.to_string()))?;
        // Write-then-rename: readers never see a partial creds file.
        let tmp = self.dir.join(format!("{CREDS_FILE}.tmp"));
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;
        tokio::fs::rename(&tmp, self.creds_path())
            .await
            .map_err(|e| StoreError::Save(e.to_string()))?;
        Ok(())
    }
}
