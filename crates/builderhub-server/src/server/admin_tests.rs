//! Tests for the admin router.
#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use super::build_admin_router;
use super::test_helpers::{TIMEOUT, json, send, test_state, test_state_with_auth};
use crate::auth::password::hash_password;
use crate::auth::{AdminAuth, AdminCredentials};

const MEASUREMENT: &str = r#"{
    "measurement_id": "m1",
    "attestation_type": "t1",
    "measurement": {"8": {"expected": "00"}, "11": {"expected": "ef"}}
}"#;

const BUILDER: &str = r#"{"name":"b1","ip_address":"10.0.0.1","network":"prod"}"#;

#[tokio::test]
async fn full_builder_lifecycle() {
    let state = test_state().await;
    let app = || build_admin_router(state.clone(), TIMEOUT);

    let steps: [(&str, &str, StatusCode); 6] = [
        ("/api/admin/v1/measurements", MEASUREMENT, StatusCode::OK),
        (
            "/api/admin/v1/measurements/activation/m1",
            r#"{"enabled":true}"#,
            StatusCode::OK,
        ),
        ("/api/admin/v1/builders", BUILDER, StatusCode::OK),
        (
            "/api/admin/v1/builders/activation/b1",
            r#"{"enabled":true}"#,
            StatusCode::PRECONDITION_FAILED,
        ),
        (
            "/api/admin/v1/builders/configuration/b1",
            r#"{"a":{"b":"X"},"n":1}"#,
            StatusCode::OK,
        ),
        (
            "/api/admin/v1/builders/activation/b1",
            r#"{"enabled":true}"#,
            StatusCode::OK,
        ),
    ];
    for (uri, body, expected) in steps {
        let (status, _) = send(app(), Method::POST, uri, &[], body).await;
        assert_eq!(status, expected, "{uri}");
    }

    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/builders/secrets/b1",
        &[],
        r#"{"a":{"b":"Y"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app(),
        Method::GET,
        "/api/admin/v1/builders/configuration/b1/active",
        &[],
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"a": {"b": "X"}, "n": 1}));

    let (status, body) = send(
        app(),
        Method::GET,
        "/api/admin/v1/builders/configuration/b1/full",
        &[],
        "",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"a": {"b": "Y"}, "n": 1}));

    let builder = state.hub.db().get_builder("b1").await.unwrap();
    assert!(builder.is_active);
}

#[tokio::test]
async fn deactivation_needs_no_config() {
    let state = test_state().await;
    let app = || build_admin_router(state.clone(), TIMEOUT);
    send(app(), Method::POST, "/api/admin/v1/builders", &[], BUILDER).await;

    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/builders/activation/b1",
        &[],
        r#"{"enabled":false}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn validation_and_conflict_statuses() {
    let state = test_state().await;
    let app = || build_admin_router(state.clone(), TIMEOUT);

    let (status, _) = send(app(), Method::POST, "/api/admin/v1/builders", &[], BUILDER).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app(), Method::POST, "/api/admin/v1/builders", &[], BUILDER).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cases = [
        (
            "/api/admin/v1/builders",
            r#"{"name":"b2","ip_address":"10.0.0.2"}"#,
        ),
        (
            "/api/admin/v1/builders",
            r#"{"name":"b3","ip_address":"nope","network":"prod"}"#,
        ),
        ("/api/admin/v1/builders/configuration/b1", "{invalid"),
        ("/api/admin/v1/builders/secrets/b1", r#"{"a":1}"#),
        ("/api/admin/v1/builders/activation/b1", r#"{"on":true}"#),
        ("/api/admin/v1/measurements", r#"{"measurement_id":"m"}"#),
    ];
    for (uri, body) in cases {
        let (status, body_bytes) = send(app(), Method::POST, uri, &[], body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
        assert_eq!(json(&body_bytes)["message"], "invalid request");
    }
}

#[tokio::test]
async fn unknown_targets_are_not_found() {
    let state = test_state().await;
    let app = || build_admin_router(state.clone(), TIMEOUT);

    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/measurements/activation/ghost",
        &[],
        r#"{"enabled":true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(),
        Method::GET,
        "/api/admin/v1/builders/configuration/ghost/active",
        &[],
        "",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/builders/configuration/ghost",
        &[],
        "{}",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn basic_auth_guards_admin_routes() {
    let auth = AdminAuth::Basic(AdminCredentials {
        user: "admin".into(),
        password_hash: hash_password("hunter2").unwrap(),
    });
    let state = test_state_with_auth(auth).await;
    let app = || build_admin_router(state.clone(), TIMEOUT);

    let (status, _) = send(app(), Method::POST, "/api/admin/v1/builders", &[], BUILDER).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = format!("Basic {}", STANDARD.encode("admin:nope"));
    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/builders",
        &[("authorization", wrong)],
        BUILDER,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let good = format!("Basic {}", STANDARD.encode("admin:hunter2"));
    let (status, _) = send(
        app(),
        Method::POST,
        "/api/admin/v1/builders",
        &[("authorization", good)],
        BUILDER,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // System endpoints are reachable without credentials.
    let (status, _) = send(app(), Method::GET, "/livez", &[], "").await;
    assert_eq!(status, StatusCode::OK);
}
