//! JSON wire types.

use std::collections::BTreeMap;

use builderhub_core::{Measurement, RegisterValue};
use serde::{Deserialize, Serialize};

use crate::storage::{BuilderWithCredentials, CredentialPair};

/// Measurement as exchanged with the admin API and listed publicly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementView {
    pub measurement_id: String,
    pub attestation_type: String,
    pub measurement: BTreeMap<String, RegisterValue>,
}

impl From<Measurement> for MeasurementView {
    fn from(m: Measurement) -> Self {
        Self {
            measurement_id: m.name,
            attestation_type: m.attestation_type,
            measurement: m.registers,
        }
    }
}

impl From<MeasurementView> for Measurement {
    fn from(v: MeasurementView) -> Self {
        Self::new(v.measurement_id, v.attestation_type, v.measurement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCredentialView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<String>,
    /// Hex-encoded; a `0x` prefix is accepted on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecdsa_pubkey: Option<String>,
}

impl From<CredentialPair> for ServiceCredentialView {
    fn from(pair: CredentialPair) -> Self {
        Self {
            tls_cert: pair.tls_cert,
            ecdsa_pubkey: pair.ecdsa_pubkey.map(hex::encode),
        }
    }
}

impl ServiceCredentialView {
    /// Decode the hex public key, if present.
    pub fn decode_ecdsa_pubkey(&self) -> Result<Option<Vec<u8>>, hex::FromHexError> {
        self.ecdsa_pubkey
            .as_deref()
            .map(|key| hex::decode(key.strip_prefix("0x").unwrap_or(key)))
            .transpose()
    }
}

/// Peer directory entry. Services are inlined next to the identity fields:
/// `{"ip": .., "name": .., "<service>": {"tls_cert": .., "ecdsa_pubkey": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerView {
    pub ip: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(flatten)]
    pub services: BTreeMap<String, ServiceCredentialView>,
}

impl From<BuilderWithCredentials> for PeerView {
    fn from(peer: BuilderWithCredentials) -> Self {
        Self {
            ip: peer.ip_address,
            name: peer.name,
            dns_name: peer.dns_name,
            services: peer
                .services
                .into_iter()
                .map(|(service, pair)| (service, pair.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuilderRequest {
    pub name: String,
    pub ip_address: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub dns_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActivationRequest {
    pub enabled: bool,
}
