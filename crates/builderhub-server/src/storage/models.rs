//! Data models for BuilderHub storage.

use std::collections::BTreeMap;

use builderhub_core::{Measurement, RegisterValue};
use serde::{Deserialize, Serialize};

use super::db::DatabaseError;

/// Network whose builders are listed by the v1 internal endpoint.
pub const PRODUCTION_NETWORK: &str = "production";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MeasurementRow {
    pub id: i64,
    pub name: String,
    pub attestation_type: String,
    /// JSON object: register -> `{"expected": "<hex>"}`.
    pub registers: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deprecated_at: Option<i64>,
}

impl MeasurementRow {
    /// Decode the stored register map into a matchable template.
    pub fn into_measurement(self) -> Result<Measurement, DatabaseError> {
        let registers: BTreeMap<String, RegisterValue> = serde_json::from_str(&self.registers)
            .map_err(|e| DatabaseError::Corrupt(format!("measurement {}: {e}", self.name)))?;
        Ok(Measurement::new(self.name, self.attestation_type, registers))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Builder {
    pub name: String,
    pub ip_address: String,
    pub network: String,
    pub dns_name: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deprecated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceCredential {
    pub id: i64,
    pub builder_name: String,
    pub service: String,
    pub tls_cert: Option<String>,
    pub ecdsa_pubkey: Option<Vec<u8>>,
    pub measurement_id: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub deprecated_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuilderConfig {
    pub id: i64,
    pub builder_name: String,
    pub config: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventLogEntry {
    pub id: i64,
    pub event_name: String,
    pub builder_name: String,
    pub measurement_name: String,
    pub created_at: i64,
}

/// Credentials a builder currently has active for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub tls_cert: Option<String>,
    pub ecdsa_pubkey: Option<Vec<u8>>,
}

/// An active builder together with its active credentials, keyed by service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderWithCredentials {
    pub name: String,
    pub ip_address: String,
    pub dns_name: Option<String>,
    pub services: BTreeMap<String, CredentialPair>,
}

/// Flat row of the peer directory join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct PeerRow {
    pub name: String,
    pub ip_address: String,
    pub dns_name: Option<String>,
    pub service: Option<String>,
    pub tls_cert: Option<String>,
    pub ecdsa_pubkey: Option<Vec<u8>>,
}
