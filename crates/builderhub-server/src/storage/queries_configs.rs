//! Builder configuration queries.

use builderhub_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use super::models::BuilderConfig;

impl HubDatabase {
    /// Store a new configuration for a builder and make it the active one.
    ///
    /// The previous active configuration is deactivated in the same
    /// transaction.
    pub async fn add_builder_config(
        &self,
        builder_name: &str,
        config: &str,
    ) -> Result<BuilderConfig, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM builders WHERE name = ?")
            .bind(builder_name)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::NotFound(format!("Builder {builder_name}")));
        }

        sqlx::query(
            "UPDATE builder_configs SET is_active = 0, updated_at = ? \
             WHERE builder_name = ? AND is_active = 1",
        )
        .bind(now)
        .bind(builder_name)
        .execute(&mut *tx)
        .await?;

        let id = sqlx::query(
            "INSERT INTO builder_configs (builder_name, config, is_active, created_at, updated_at) \
             VALUES (?, ?, 1, ?, ?)",
        )
        .bind(builder_name)
        .bind(config)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let row = sqlx::query_as::<_, BuilderConfig>("SELECT * FROM builder_configs WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row)
    }

    /// Get the active configuration of a builder.
    pub async fn get_active_config(&self, builder_name: &str) -> Result<BuilderConfig, DatabaseError> {
        sqlx::query_as::<_, BuilderConfig>(
            "SELECT * FROM builder_configs WHERE builder_name = ? AND is_active = 1",
        )
        .bind(builder_name)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Active config for builder {builder_name}")))
    }
}
