//! Liveness, readiness and drain endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;

use super::state::AppState;

/// `GET /livez`
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// `GET /readyz`: 503 while draining.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// `GET /drain`: mark not ready, then give load balancers time to notice.
pub async fn drain(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        state.set_ready(false);
        info!(wait = ?state.drain_wait(), "Draining");
        tokio::time::sleep(state.drain_wait()).await;
    }
    StatusCode::OK
}

/// `GET /undrain`
pub async fn undrain(State(state): State<AppState>) -> StatusCode {
    if !state.is_ready() {
        state.set_ready(true);
        info!("Undrained");
    }
    StatusCode::OK
}
