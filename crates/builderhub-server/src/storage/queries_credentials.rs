//! Service credential queries.

use builderhub_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use super::models::ServiceCredential;

/// Parameters for registering a service credential.
#[derive(Debug, Clone, Copy)]
pub struct NewCredential<'a> {
    pub builder_name: &'a str,
    pub service: &'a str,
    pub tls_cert: Option<&'a str>,
    pub ecdsa_pubkey: Option<&'a [u8]>,
    /// Measurement that authorised the registration.
    pub measurement_name: &'a str,
    pub attestation_type: &'a str,
}

impl HubDatabase {
    /// Replace the active credential for `(builder, service)`.
    ///
    /// Deprecates every active row for the pair and inserts the new one in a
    /// single transaction. The authorising measurement is resolved inside the
    /// same transaction; if it does not exist nothing is written. Empty
    /// certificate or key values are stored as NULL.
    pub async fn register_credential(
        &self,
        credential: &NewCredential<'_>,
    ) -> Result<ServiceCredential, DatabaseError> {
        let now = unix_timestamp();
        let tls_cert = credential.tls_cert.filter(|c| !c.is_empty());
        let ecdsa_pubkey = credential.ecdsa_pubkey.filter(|k| !k.is_empty());

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "UPDATE service_credentials SET is_active = 0, deprecated_at = ? \
             WHERE builder_name = ? AND service = ? AND is_active = 1",
        )
        .bind(now)
        .bind(credential.builder_name)
        .bind(credential.service)
        .execute(&mut *tx)
        .await?;

        let measurement_id: i64 = sqlx::query_scalar(
            "SELECT id FROM measurements WHERE name = ? AND attestation_type = ?",
        )
        .bind(credential.measurement_name)
        .bind(credential.attestation_type)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            DatabaseError::PreconditionFailed(format!(
                "Measurement {} ({})",
                credential.measurement_name, credential.attestation_type
            ))
        })?;

        let id = sqlx::query(
            "INSERT INTO service_credentials \
             (builder_name, service, tls_cert, ecdsa_pubkey, measurement_id, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(credential.builder_name)
        .bind(credential.service)
        .bind(tls_cert)
        .bind(ecdsa_pubkey)
        .bind(measurement_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let row = sqlx::query_as::<_, ServiceCredential>("SELECT * FROM service_credentials WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row)
    }

    /// Get the active credential for `(builder, service)`, if any.
    pub async fn get_active_credential(
        &self,
        builder_name: &str,
        service: &str,
    ) -> Result<Option<ServiceCredential>, DatabaseError> {
        let row = sqlx::query_as::<_, ServiceCredential>(
            "SELECT * FROM service_credentials WHERE builder_name = ? AND service = ? AND is_active = 1",
        )
        .bind(builder_name)
        .bind(service)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    /// Full credential history for `(builder, service)`, oldest first.
    pub async fn list_credentials(
        &self,
        builder_name: &str,
        service: &str,
    ) -> Result<Vec<ServiceCredential>, DatabaseError> {
        let rows = sqlx::query_as::<_, ServiceCredential>(
            "SELECT * FROM service_credentials WHERE builder_name = ? AND service = ? ORDER BY id",
        )
        .bind(builder_name)
        .bind(service)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
