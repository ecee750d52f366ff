//! Builder registry queries.

use builderhub_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use super::models::{Builder, BuilderWithCredentials, CredentialPair, PeerRow};

/// Parameters for registering a builder.
#[derive(Debug, Clone, Copy)]
pub struct NewBuilder<'a> {
    pub name: &'a str,
    pub ip_address: &'a str,
    pub network: &'a str,
    pub dns_name: Option<&'a str>,
}

impl HubDatabase {
    // =========================================================================
    // Builder queries
    // =========================================================================

    /// Create a new builder. New builders start inactive.
    pub async fn create_builder(&self, builder: &NewBuilder<'_>) -> Result<Builder, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO builders (name, ip_address, network, dns_name, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(builder.name)
        .bind(builder.ip_address)
        .bind(builder.network)
        .bind(builder.dns_name)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_builder(builder.name).await
    }

    /// Get a builder by name.
    pub async fn get_builder(&self, name: &str) -> Result<Builder, DatabaseError> {
        sqlx::query_as::<_, Builder>("SELECT * FROM builders WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Builder {name}")))
    }

    /// Find the active builder registered for a source IP.
    pub async fn get_active_builder_by_ip(&self, ip: &str) -> Result<Option<Builder>, DatabaseError> {
        let builder = sqlx::query_as::<_, Builder>(
            "SELECT * FROM builders WHERE ip_address = ? AND is_active = 1",
        )
        .bind(ip)
        .fetch_optional(self.pool())
        .await?;

        Ok(builder)
    }

    /// Activate or deactivate a builder.
    ///
    /// Activation requires an active configuration and fails with
    /// `PreconditionFailed` otherwise; the check and the update share one
    /// transaction. Deactivation is unconditional and stamps `deprecated_at`.
    pub async fn set_builder_active(&self, name: &str, active: bool) -> Result<Builder, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        if active {
            let has_config: Option<i64> = sqlx::query_scalar(
                "SELECT 1 FROM builder_configs WHERE builder_name = ? AND is_active = 1",
            )
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            if has_config.is_none() {
                return Err(DatabaseError::PreconditionFailed(format!(
                    "Builder {name} has no active config"
                )));
            }
        }

        let result = sqlx::query(
            "UPDATE builders SET is_active = ?, updated_at = ?, deprecated_at = ? WHERE name = ?",
        )
        .bind(active)
        .bind(now)
        .bind((!active).then_some(now))
        .bind(name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Builder {name}")));
        }

        tx.commit().await?;

        self.get_builder(name).await
    }

    /// List active builders, optionally restricted to one network.
    pub async fn list_active_builders(
        &self,
        network: Option<&str>,
    ) -> Result<Vec<Builder>, DatabaseError> {
        let builders = sqlx::query_as::<_, Builder>(
            "SELECT * FROM builders WHERE is_active = 1 AND (? IS NULL OR network = ?) ORDER BY name",
        )
        .bind(network)
        .bind(network)
        .fetch_all(self.pool())
        .await?;

        Ok(builders)
    }

    /// Peer directory: active builders of a network with their active
    /// credentials, ordered by builder name.
    pub async fn list_active_builders_with_credentials(
        &self,
        network: &str,
    ) -> Result<Vec<BuilderWithCredentials>, DatabaseError> {
        let rows = sqlx::query_as::<_, PeerRow>(
            "SELECT b.name, b.ip_address, b.dns_name, c.service, c.tls_cert, c.ecdsa_pubkey \
             FROM builders b \
             LEFT JOIN service_credentials c ON c.builder_name = b.name AND c.is_active = 1 \
             WHERE b.is_active = 1 AND b.network = ? \
             ORDER BY b.name, c.service",
        )
        .bind(network)
        .fetch_all(self.pool())
        .await?;

        let mut peers: Vec<BuilderWithCredentials> = Vec::new();
        for row in rows {
            if peers.last().is_none_or(|last| last.name != row.name) {
                peers.push(BuilderWithCredentials {
                    name: row.name.clone(),
                    ip_address: row.ip_address.clone(),
                    dns_name: row.dns_name.clone(),
                    services: std::collections::BTreeMap::new(),
                });
            }
            if let (Some(service), Some(peer)) = (row.service, peers.last_mut()) {
                peer.services.insert(
                    service,
                    CredentialPair {
                        tls_cert: row.tls_cert,
                        ecdsa_pubkey: row.ecdsa_pubkey,
                    },
                );
            }
        }

        Ok(peers)
    }
}
