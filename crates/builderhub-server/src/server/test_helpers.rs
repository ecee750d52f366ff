//! Shared test helpers for the router test modules.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use builderhub_core::{Measurement, RegisterValue};
use tower::ServiceExt;

use super::attestation::{ATTESTATION_TYPE_HEADER, FORWARDED_FOR_HEADER, MEASUREMENT_HEADER};
use super::state::AppState;
use crate::auth::AdminAuth;
use crate::hub::{BuilderHub, BuilderRegistration};
use crate::secrets::MemorySecretStore;
use crate::storage::HubDatabase;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Register values that satisfy measurement `m1`.
pub const M1_REPORT: &str = r#"{"8":"00","11":"ef","99":"ignored"}"#;

pub async fn test_state_with_auth(admin_auth: AdminAuth) -> AppState {
    let db = HubDatabase::open_in_memory().await.unwrap();
    let hub = BuilderHub::new(db, Arc::new(MemorySecretStore::new()));
    AppState::new(hub, admin_auth, Duration::ZERO)
}

pub async fn test_state() -> AppState {
    test_state_with_auth(AdminAuth::Disabled).await
}

pub async fn add_active_builder(state: &AppState, name: &str, ip: &str, network: &str) {
    state
        .hub
        .create_builder(&BuilderRegistration {
            name: name.into(),
            ip_address: ip.into(),
            network: network.into(),
            dns_name: None,
        })
        .await
        .unwrap();
    state
        .hub
        .upload_config(name, br#"{"a":{"b":"X"}}"#)
        .await
        .unwrap();
    state.hub.set_builder_active(name, true).await.unwrap();
}

/// Active measurement `m1` (type `t1`), builder `b1` on 10.0.0.1 in `prod`
/// and builder `b2` on 10.0.0.2 in `test`.
pub async fn seeded_state() -> AppState {
    let state = test_state().await;
    let m1 = Measurement::new(
        "m1",
        "t1",
        [("8", "00"), ("11", "ef")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), RegisterValue::new(v)))
            .collect(),
    );
    state.hub.create_measurement(&m1).await.unwrap();
    state.hub.set_measurement_active("m1", true).await.unwrap();
    add_active_builder(&state, "b1", "10.0.0.1", "prod").await;
    add_active_builder(&state, "b2", "10.0.0.2", "test").await;
    state
}

/// Attestation headers for a caller at `ip` presenting `report`.
pub fn attested(ip: &str, report: &str) -> Vec<(&'static str, String)> {
    vec![
        (ATTESTATION_TYPE_HEADER, "t1".to_string()),
        (MEASUREMENT_HEADER, report.to_string()),
        (FORWARDED_FOR_HEADER, ip.to_string()),
    ]
}

/// Send a request and return (status, body bytes).
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    headers: &[(&str, String)],
    body: impl Into<Body>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let resp = app
        .oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}
