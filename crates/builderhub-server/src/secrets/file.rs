//! File-backed secret store.
//!
//! Each builder's secrets live in `<dir>/<prefix>_<builder>.json`. Writes go
//! to a temporary file in the same directory and are renamed into place, so
//! readers see either the old or the new document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{SecretMap, SecretStore, SecretStoreError, validate_name};

#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
    prefix: String,
}

impl FileSecretStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, SecretStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, builder: &str) -> Result<PathBuf, SecretStoreError> {
        validate_name(builder)?;
        Ok(self.dir.join(format!("{}_{builder}.json", self.prefix)))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secrets(&self, builder: &str) -> Result<SecretMap, SecretStoreError> {
        let path = self.path_for(builder)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SecretMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_secrets(&self, builder: &str, secrets: SecretMap) -> Result<(), SecretStoreError> {
        let path = self.path_for(builder)?;
        let tmp = self
            .dir
            .join(format!(".{}_{builder}.{}.tmp", self.prefix, uuid::Uuid::new_v4()));

        let bytes = serde_json::to_vec_pretty(&secrets)?;
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(builder, path = %path.display(), entries = secrets.len(), "Secrets written");
        Ok(())
    }
}
