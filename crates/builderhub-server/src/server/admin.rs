//! Admin API.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use builderhub_core::Measurement;
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;
use super::views::{ActivationRequest, BuilderRequest, MeasurementView};
use crate::hub::BuilderRegistration;

/// Reject requests without valid admin credentials.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.admin_auth.authorize(request.headers()) {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Admin authentication failed");
        ApiError::Unauthorized.into_response()
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("malformed body: {e}")))
}

/// `POST /api/admin/v1/measurements`
pub async fn create_measurement(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let view: MeasurementView = parse_json(&body)?;
    state
        .hub
        .create_measurement(&Measurement::from(view))
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/admin/v1/measurements/activation/{name}`
pub async fn set_measurement_activation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: ActivationRequest = parse_json(&body)?;
    state
        .hub
        .set_measurement_active(&name, request.enabled)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/admin/v1/builders`
pub async fn create_builder(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: BuilderRequest = parse_json(&body)?;
    state
        .hub
        .create_builder(&BuilderRegistration {
            name: request.name,
            ip_address: request.ip_address,
            network: request.network,
            dns_name: request.dns_name,
        })
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /api/admin/v1/builders/activation/{name}`
pub async fn set_builder_activation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: ActivationRequest = parse_json(&body)?;
    state.hub.set_builder_active(&name, request.enabled).await?;
    Ok(StatusCode::OK)
}

/// `GET /api/admin/v1/builders/configuration/{name}/active`
pub async fn get_active_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.hub.active_config(&name).await?))
}

/// `GET /api/admin/v1/builders/configuration/{name}/full`: config with
/// secrets applied.
pub async fn get_full_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.hub.full_config(&name).await?))
}

/// `POST /api/admin/v1/builders/configuration/{name}`
pub async fn upload_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    state.hub.upload_config(&name, &body).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/admin/v1/builders/secrets/{name}`
pub async fn set_secrets(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let document: serde_json::Value = parse_json(&body)?;
    state.hub.set_secrets(&name, &document).await?;
    Ok(StatusCode::OK)
}
