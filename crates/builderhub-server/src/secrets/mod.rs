//! Secret store adapters.
//!
//! Secrets are kept per builder as a flat map from dotted config paths to
//! string values (see [`builderhub_core::overlay`]).

mod file;
mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

/// Flat secrets of one builder.
pub type SecretMap = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("Invalid builder name for secret storage: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed secret document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store for builder secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Secrets for `builder`. A builder with no stored secrets yields an
    /// empty map.
    async fn get_secrets(&self, builder: &str) -> Result<SecretMap, SecretStoreError>;

    /// Replace all secrets for `builder`.
    async fn set_secrets(&self, builder: &str, secrets: SecretMap) -> Result<(), SecretStoreError>;
}

/// Builder names become part of storage keys and file names:
/// `[A-Za-z0-9_.-]+`, not starting with a dot.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn validate_name(builder: &str) -> Result<(), SecretStoreError> {
    if is_valid_name(builder) {
        Ok(())
    } else {
        Err(SecretStoreError::InvalidName(builder.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_builder_names() {
        for name in ["b1", "builder-01", "flashbots_us.east"] {
            assert!(validate_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", "..", ".hidden", "a/b", "../etc/passwd", "a b", "a\\b"] {
            assert!(validate_name(name).is_err(), "{name}");
        }
    }
}
