//! Measurement registry queries.

use std::collections::BTreeMap;

use builderhub_core::db::unix_timestamp;
use builderhub_core::{Measurement, RegisterValue};

use super::db::{DatabaseError, HubDatabase};
use super::models::MeasurementRow;

impl HubDatabase {
    /// Create a new measurement. New measurements start inactive.
    pub async fn create_measurement(
        &self,
        name: &str,
        attestation_type: &str,
        registers: &BTreeMap<String, RegisterValue>,
    ) -> Result<MeasurementRow, DatabaseError> {
        let now = unix_timestamp();
        let registers =
            serde_json::to_string(registers).map_err(|e| DatabaseError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO measurements (name, attestation_type, registers, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, ?)",
        )
        .bind(name)
        .bind(attestation_type)
        .bind(&registers)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_measurement(name, attestation_type).await
    }

    /// Get a measurement by its `(name, attestation_type)` identity.
    pub async fn get_measurement(
        &self,
        name: &str,
        attestation_type: &str,
    ) -> Result<MeasurementRow, DatabaseError> {
        sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM measurements WHERE name = ? AND attestation_type = ?",
        )
        .bind(name)
        .bind(attestation_type)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Measurement {name} ({attestation_type})")))
    }

    /// Activate or deactivate measurements by name.
    ///
    /// Without an attestation type every row with that name is toggled.
    /// Deactivation stamps `deprecated_at`; activation clears it. Returns the
    /// number of rows changed.
    pub async fn set_measurement_active(
        &self,
        name: &str,
        attestation_type: Option<&str>,
        active: bool,
    ) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();
        let deprecated_at = (!active).then_some(now);

        let result = sqlx::query(
            "UPDATE measurements SET is_active = ?, updated_at = ?, deprecated_at = ? \
             WHERE name = ? AND (? IS NULL OR attestation_type = ?)",
        )
        .bind(active)
        .bind(now)
        .bind(deprecated_at)
        .bind(name)
        .bind(attestation_type)
        .bind(attestation_type)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Measurement {name}")));
        }
        Ok(result.rows_affected())
    }

    /// List active measurements, optionally for one attestation type,
    /// ordered by name.
    pub async fn list_active_measurements(
        &self,
        attestation_type: Option<&str>,
    ) -> Result<Vec<Measurement>, DatabaseError> {
        let rows = sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM measurements WHERE is_active = 1 AND (? IS NULL OR attestation_type = ?) \
             ORDER BY name, attestation_type",
        )
        .bind(attestation_type)
        .bind(attestation_type)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(MeasurementRow::into_measurement).collect()
    }
}
