//! Application-layer errors.

use crate::secrets::SecretStoreError;
use crate::storage::DatabaseError;

pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// No active measurement of the claimed type matched the report.
    #[error("No active measurement of type {attestation_type} matches the report")]
    MeasurementMismatch { attestation_type: String },

    /// No active builder is registered for the source IP.
    #[error("No active builder for {ip}")]
    BuilderNotFound { ip: String },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Store(DatabaseError),

    #[error("Secret store error: {0}")]
    Secrets(SecretStoreError),

    /// Stored secrets cannot be applied to the stored config.
    #[error("Config merge failed: {0}")]
    Merge(builderhub_core::Error),
}

impl HubError {
    /// Both verification failures are reported identically to callers.
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::MeasurementMismatch { .. } | Self::BuilderNotFound { .. }
        )
    }
}

impl From<DatabaseError> for HubError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(msg) => Self::NotFound(msg),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            DatabaseError::PreconditionFailed(msg) => Self::PreconditionFailed(msg),
            other => Self::Store(other),
        }
    }
}

impl From<SecretStoreError> for HubError {
    fn from(e: SecretStoreError) -> Self {
        match e {
            SecretStoreError::InvalidName(name) => {
                Self::Validation(format!("invalid builder name {name:?}"))
            }
            other => Self::Secrets(other),
        }
    }
}
