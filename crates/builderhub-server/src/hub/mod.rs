//! Builder hub application layer.
//!
//! Ties the registries, the secret store and the overlay engine together:
//! attestation verification, credential registration, config delivery and
//! the admin operations.

mod error;


use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use builderhub_core::{Measurement, match_measurement, overlay};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::secrets::{SecretStore, is_valid_name};
use crate::storage::{
    Builder, BuilderConfig, BuilderWithCredentials, DatabaseError, HubDatabase, NewBuilder,
    NewCredential, ServiceCredential,
};

pub use error::{HubError, HubResult};

pub const EVENT_GET_CONFIG: &str = "get_config";
pub const EVENT_REGISTER_CREDENTIALS: &str = "register_credentials";

/// A builder that passed IP and measurement verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedBuilder {
    pub builder: Builder,
    pub measurement_name: String,
    pub attestation_type: String,
}

/// Parameters for registering a builder.
#[derive(Debug, Clone)]
pub struct BuilderRegistration {
    pub name: String,
    pub ip_address: String,
    pub network: String,
    pub dns_name: Option<String>,
}

#[derive(Clone)]
pub struct BuilderHub {
    db: HubDatabase,
    secrets: Arc<dyn SecretStore>,
}

/// Keys of a peer directory entry that services are listed next to.
pub const RESERVED_SERVICE_NAMES: [&str; 3] = ["ip", "name", "dns_name"];

fn validate_builder_name(name: &str) -> HubResult<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(HubError::Validation(format!("invalid builder name {name:?}")))
    }
}

/// Service names: `[A-Za-z0-9_-]+`, excluding [`RESERVED_SERVICE_NAMES`].
fn validate_service(service: &str) -> HubResult<()> {
    let well_formed = !service.is_empty()
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if !well_formed {
        return Err(HubError::Validation(format!("invalid service name {service:?}")));
    }
    if RESERVED_SERVICE_NAMES.contains(&service) {
        return Err(HubError::Validation(format!("service name {service:?} is reserved")));
    }
    Ok(())
}

impl BuilderHub {
    pub fn new(db: HubDatabase, secrets: Arc<dyn SecretStore>) -> Self {
        Self { db, secrets }
    }

    pub const fn db(&self) -> &HubDatabase {
        &self.db
    }

    // =========================================================================
    // Attested operations
    // =========================================================================

    /// Resolve the caller's builder identity from its attestation report and
    /// source IP.
    ///
    /// The measurement is checked first, then the IP. Nothing is cached: every
    /// call sees the latest registry state.
    #[instrument(skip_all, fields(attestation_type, %ip))]
    pub async fn verify(
        &self,
        attestation_type: &str,
        measurements: &BTreeMap<String, String>,
        ip: IpAddr,
    ) -> HubResult<AuthenticatedBuilder> {
        let candidates = self
            .db
            .list_active_measurements(Some(attestation_type))
            .await?;
        let Some(matched) = match_measurement(measurements, &candidates) else {
            warn!(candidates = candidates.len(), "No measurement matched");
            #[cfg(feature = "metrics")]
            builderhub_core::metrics::record_verification(attestation_type, "measurement_mismatch");
            return Err(HubError::MeasurementMismatch {
                attestation_type: attestation_type.to_string(),
            });
        };

        let ip = ip.to_canonical().to_string();
        let Some(builder) = self.db.get_active_builder_by_ip(&ip).await? else {
            warn!(measurement = %matched.name, "No active builder for source IP");
            #[cfg(feature = "metrics")]
            builderhub_core::metrics::record_verification(attestation_type, "builder_not_found");
            return Err(HubError::BuilderNotFound { ip });
        };

        info!(builder = %builder.name, measurement = %matched.name, "Builder verified");
        #[cfg(feature = "metrics")]
        builderhub_core::metrics::record_verification(attestation_type, "verified");
        Ok(AuthenticatedBuilder {
            builder,
            measurement_name: matched.name.clone(),
            attestation_type: attestation_type.to_string(),
        })
    }

    /// Replace the caller's credential for `service`.
    ///
    /// Empty certificate or key values are treated as absent.
    #[instrument(skip(self, auth, tls_cert, ecdsa_pubkey), fields(builder = %auth.builder.name))]
    pub async fn register_credentials(
        &self,
        auth: &AuthenticatedBuilder,
        service: &str,
        tls_cert: Option<&str>,
        ecdsa_pubkey: Option<&[u8]>,
    ) -> HubResult<ServiceCredential> {
        validate_service(service)?;

        let credential = self
            .db
            .register_credential(&NewCredential {
                builder_name: &auth.builder.name,
                service,
                tls_cert,
                ecdsa_pubkey,
                measurement_name: &auth.measurement_name,
                attestation_type: &auth.attestation_type,
            })
            .await?;

        self.record_event(EVENT_REGISTER_CREDENTIALS, auth).await;

        info!(
            service,
            tls_cert = credential.tls_cert.is_some(),
            ecdsa_pubkey = credential.ecdsa_pubkey.is_some(),
            "Credentials registered"
        );
        Ok(credential)
    }

    /// The caller's active config with its secrets applied.
    #[instrument(skip(self, auth), fields(builder = %auth.builder.name))]
    pub async fn config_with_secrets(&self, auth: &AuthenticatedBuilder) -> HubResult<Value> {
        let merged = self.full_config(&auth.builder.name).await?;
        self.record_event(EVENT_GET_CONFIG, auth).await;
        Ok(merged)
    }

    /// Append to the event log. The audited operation has already taken
    /// effect, so a failed append is logged rather than returned.
    async fn record_event(&self, event: &str, auth: &AuthenticatedBuilder) {
        if let Err(e) = self
            .db
            .log_event(event, &auth.builder.name, &auth.measurement_name)
            .await
        {
            warn!(event, error = %e, "Failed to record event");
        }
    }

    /// Peer directory of one network.
    pub async fn peers(&self, network: &str) -> HubResult<Vec<BuilderWithCredentials>> {
        Ok(self.db.list_active_builders_with_credentials(network).await?)
    }

    /// All active measurements.
    pub async fn allowed_measurements(&self) -> HubResult<Vec<Measurement>> {
        Ok(self.db.list_active_measurements(None).await?)
    }

    // =========================================================================
    // Admin operations
    // =========================================================================

    /// Register a new, inactive measurement.
    ///
    /// A template with no registers would match every report and is rejected.
    #[instrument(skip(self, measurement), fields(name = %measurement.name))]
    pub async fn create_measurement(&self, measurement: &Measurement) -> HubResult<()> {
        if measurement.name.is_empty() || measurement.attestation_type.is_empty() {
            return Err(HubError::Validation(
                "measurement name and attestation type are required".into(),
            ));
        }
        if measurement.registers.is_empty() {
            return Err(HubError::Validation(
                "measurement must pin at least one register".into(),
            ));
        }

        self.db
            .create_measurement(
                &measurement.name,
                &measurement.attestation_type,
                &measurement.registers,
            )
            .await?;
        info!(attestation_type = %measurement.attestation_type, "Measurement created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_measurement_active(&self, name: &str, active: bool) -> HubResult<()> {
        let rows = self.db.set_measurement_active(name, None, active).await?;
        info!(rows, "Measurement status changed");
        Ok(())
    }

    /// Register a new, inactive builder.
    #[instrument(skip(self, registration), fields(name = %registration.name))]
    pub async fn create_builder(&self, registration: &BuilderRegistration) -> HubResult<Builder> {
        validate_builder_name(&registration.name)?;
        if registration.network.is_empty() {
            return Err(HubError::Validation("network is required".into()));
        }
        let ip: IpAddr = registration.ip_address.trim().parse().map_err(|_| {
            HubError::Validation(format!("invalid IP address {:?}", registration.ip_address))
        })?;
        let ip = ip.to_canonical().to_string();

        let builder = self
            .db
            .create_builder(&NewBuilder {
                name: &registration.name,
                ip_address: &ip,
                network: &registration.network,
                dns_name: registration.dns_name.as_deref().filter(|d| !d.is_empty()),
            })
            .await?;
        info!(ip = %builder.ip_address, network = %builder.network, "Builder created");
        Ok(builder)
    }

    /// Activation requires an active config; deactivation always succeeds.
    #[instrument(skip(self))]
    pub async fn set_builder_active(&self, name: &str, active: bool) -> HubResult<Builder> {
        let builder = self.db.set_builder_active(name, active).await?;
        info!("Builder status changed");
        Ok(builder)
    }

    /// Store `raw` as the builder's new active config.
    #[instrument(skip(self, raw))]
    pub async fn upload_config(&self, name: &str, raw: &[u8]) -> HubResult<BuilderConfig> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| HubError::Validation(format!("config is not valid JSON: {e}")))?;
        let config = self
            .db
            .add_builder_config(name, &document.to_string())
            .await?;
        info!(config_id = config.id, "Builder config uploaded");
        Ok(config)
    }

    /// Replace a builder's secrets with the string leaves of `document`.
    #[instrument(skip(self, document))]
    pub async fn set_secrets(&self, name: &str, document: &Value) -> HubResult<()> {
        self.db.get_builder(name).await?;
        let flat = overlay::flatten(document).map_err(|e| HubError::Validation(e.to_string()))?;
        let entries = flat.len();
        self.secrets.set_secrets(name, flat).await?;
        info!(entries, "Builder secrets updated");
        Ok(())
    }

    /// The builder's active config without secrets.
    pub async fn active_config(&self, name: &str) -> HubResult<Value> {
        let config = self.db.get_active_config(name).await?;
        serde_json::from_str(&config.config).map_err(|e| {
            HubError::Store(DatabaseError::Corrupt(format!("config {}: {e}", config.id)))
        })
    }

    /// The builder's active config with its secrets applied.
    pub async fn full_config(&self, name: &str) -> HubResult<Value> {
        let config = self.active_config(name).await?;
        let secrets = self.secrets.get_secrets(name).await?;
        overlay::merge(&config, &secrets).map_err(HubError::Merge)
    }
}
