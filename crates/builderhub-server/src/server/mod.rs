//! HTTP surfaces for BuilderHub.
//!
//! Three routers share one [`AppState`]: the attested public API, the admin
//! API and the internal peer listing. Each also serves the system endpoints
//! and runs every request under a timeout; a timed-out request is dropped,
//! rolling back any open transaction.

pub mod admin;
pub mod api;
pub mod attestation;
pub mod config;
pub mod error;
pub mod internal;
pub mod state;
pub mod system;
pub mod views;

#[cfg(test)]
mod test_helpers;


#[cfg(test)]
mod admin_tests;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use attestation::AttestationClaim;
pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/livez", get(system::livez))
        .route("/readyz", get(system::readyz))
        .route("/drain", get(system::drain))
        .route("/undrain", get(system::undrain))
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn finish(
    listener: &'static str,
    routes: Router<AppState>,
    state: AppState,
    request_timeout: Duration,
) -> Router {
    let router = routes
        .merge(system_routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    #[cfg(feature = "metrics")]
    let router = router.layer(axum::middleware::from_fn(
        move |request: axum::extract::Request, next: axum::middleware::Next| async move {
            let response = next.run(request).await;
            builderhub_core::metrics::record_http_request(listener, response.status().as_u16());
            response
        },
    ));

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Attested builder API.
pub fn build_public_router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/api/l1-builder/v1/measurements", get(api::list_measurements))
        .route("/api/l1-builder/v1/builders", get(api::list_peers))
        .route("/api/l1-builder/v1/configuration", get(api::get_configuration))
        .route(
            "/api/l1-builder/v1/register_credentials/{service}",
            post(api::register_credentials),
        );
    finish("public", routes, state, request_timeout)
}

/// Admin API, behind Basic auth. System endpoints stay unauthenticated.
pub fn build_admin_router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/api/admin/v1/measurements", post(admin::create_measurement))
        .route(
            "/api/admin/v1/measurements/activation/{name}",
            post(admin::set_measurement_activation),
        )
        .route("/api/admin/v1/builders", post(admin::create_builder))
        .route(
            "/api/admin/v1/builders/activation/{name}",
            post(admin::set_builder_activation),
        )
        .route(
            "/api/admin/v1/builders/configuration/{name}/active",
            get(admin::get_active_config),
        )
        .route(
            "/api/admin/v1/builders/configuration/{name}/full",
            get(admin::get_full_config),
        )
        .route(
            "/api/admin/v1/builders/configuration/{name}",
            post(admin::upload_config),
        )
        .route(
            "/api/admin/v1/builders/secrets/{name}",
            post(admin::set_secrets),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin::require_admin,
        ));
    finish("admin", routes, state, request_timeout)
}

/// Internal peer listing.
pub fn build_internal_router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route(
            "/api/internal/l1-builder/v1/builders",
            get(internal::list_production_builders),
        )
        .route(
            "/api/internal/l1-builder/v2/network/{network}/builders",
            get(internal::list_network_builders),
        );
    finish("internal", routes, state, request_timeout)
}
