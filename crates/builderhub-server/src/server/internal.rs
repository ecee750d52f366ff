//! Internal API: unauthenticated peer listing for the private network.

use axum::Json;
use axum::extract::{Path, State};

use super::error::ApiError;
use super::state::AppState;
use super::views::PeerView;
use crate::storage::PRODUCTION_NETWORK;

async fn peers(state: &AppState, network: &str) -> Result<Json<Vec<PeerView>>, ApiError> {
    let peers = state.hub.peers(network).await?;
    Ok(Json(peers.into_iter().map(Into::into).collect()))
}

/// `GET /api/internal/l1-builder/v1/builders`: production peers.
pub async fn list_production_builders(
    State(state): State<AppState>,
) -> Result<Json<Vec<PeerView>>, ApiError> {
    peers(&state, PRODUCTION_NETWORK).await
}

/// `GET /api/internal/l1-builder/v2/network/{network}/builders`
pub async fn list_network_builders(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> Result<Json<Vec<PeerView>>, ApiError> {
    peers(&state, &network).await
}
