//! Attested public API.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use super::attestation::AttestationClaim;
use super::error::ApiError;
use super::state::AppState;
use super::views::{MeasurementView, PeerView, ServiceCredentialView};
use crate::hub::AuthenticatedBuilder;

async fn authenticate(state: &AppState, claim: &AttestationClaim) -> Result<AuthenticatedBuilder, ApiError> {
    Ok(state
        .hub
        .verify(&claim.attestation_type, &claim.measurements, claim.ip)
        .await?)
}

/// `GET /api/l1-builder/v1/measurements`
pub async fn list_measurements(
    State(state): State<AppState>,
) -> Result<Json<Vec<MeasurementView>>, ApiError> {
    let measurements = state.hub.allowed_measurements().await?;
    Ok(Json(measurements.into_iter().map(Into::into).collect()))
}

/// `GET /api/l1-builder/v1/builders`: peers in the caller's network.
#[instrument(skip_all)]
pub async fn list_peers(
    State(state): State<AppState>,
    claim: AttestationClaim,
) -> Result<Json<Vec<PeerView>>, ApiError> {
    let auth = authenticate(&state, &claim).await?;
    let peers = state.hub.peers(&auth.builder.network).await?;
    Ok(Json(peers.into_iter().map(Into::into).collect()))
}

/// `GET /api/l1-builder/v1/configuration`
#[instrument(skip_all)]
pub async fn get_configuration(
    State(state): State<AppState>,
    claim: AttestationClaim,
) -> Result<Json<serde_json::Value>, ApiError> {
    let auth = authenticate(&state, &claim).await?;
    Ok(Json(state.hub.config_with_secrets(&auth).await?))
}

/// `POST /api/l1-builder/v1/register_credentials/{service}`
#[instrument(skip(state, claim, body))]
pub async fn register_credentials(
    State(state): State<AppState>,
    Path(service): Path<String>,
    claim: AttestationClaim,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let auth = authenticate(&state, &claim).await?;

    let request: ServiceCredentialView = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed credentials: {e}")))?;
    let ecdsa_pubkey = request
        .decode_ecdsa_pubkey()
        .map_err(|e| ApiError::BadRequest(format!("ecdsa_pubkey is not valid hex: {e}")))?;

    state
        .hub
        .register_credentials(
            &auth,
            &service,
            request.tls_cert.as_deref(),
            ecdsa_pubkey.as_deref(),
        )
        .await?;
    Ok(StatusCode::OK)
}
