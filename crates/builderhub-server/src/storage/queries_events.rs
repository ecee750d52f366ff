//! Audit event log.

use builderhub_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use super::models::EventLogEntry;

impl HubDatabase {
    /// Append an event to the audit log.
    pub async fn log_event(
        &self,
        event_name: &str,
        builder_name: &str,
        measurement_name: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO event_log (event_name, builder_name, measurement_name, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(event_name)
        .bind(builder_name)
        .bind(measurement_name)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Events recorded for a builder, oldest first.
    pub async fn list_events(&self, builder_name: &str) -> Result<Vec<EventLogEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, EventLogEntry>(
            "SELECT * FROM event_log WHERE builder_name = ? ORDER BY id",
        )
        .bind(builder_name)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}
