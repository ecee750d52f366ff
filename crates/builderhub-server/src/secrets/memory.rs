//! In-process secret store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SecretMap, SecretStore, SecretStoreError, validate_name};

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, SecretMap>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secrets(&self, builder: &str) -> Result<SecretMap, SecretStoreError> {
        validate_name(builder)?;
        Ok(self
            .secrets
            .read()
            .await
            .get(builder)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_secrets(&self, builder: &str, secrets: SecretMap) -> Result<(), SecretStoreError> {
        validate_name(builder)?;
        self.secrets
            .write()
            .await
            .insert(builder.to_string(), secrets);
        Ok(())
    }
}
