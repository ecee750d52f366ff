//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::hub::HubError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Attestation headers missing/malformed or verification failed.
    #[error("Forbidden")]
    Forbidden,

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn body(status: StatusCode, message: &str, error: Option<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
            error,
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => body(StatusCode::BAD_REQUEST, "invalid request", Some(msg)),
            Self::Forbidden => body(StatusCode::FORBIDDEN, "forbidden", None),
            Self::Unauthorized => {
                let mut resp = body(StatusCode::UNAUTHORIZED, "unauthorized", None);
                resp.headers_mut().insert(
                    axum::http::header::WWW_AUTHENTICATE,
                    axum::http::HeaderValue::from_static("Basic realm=\"builderhub admin\""),
                );
                resp
            }
            Self::Hub(e) if e.is_authentication_failure() => {
                warn!(error = %e, "Attestation rejected");
                body(StatusCode::FORBIDDEN, "forbidden", None)
            }
            Self::Hub(HubError::NotFound(msg)) => body(StatusCode::NOT_FOUND, "not found", Some(msg)),
            Self::Hub(HubError::PreconditionFailed(msg)) => {
                body(StatusCode::PRECONDITION_FAILED, "precondition failed", Some(msg))
            }
            Self::Hub(HubError::Conflict(msg)) => body(StatusCode::CONFLICT, "conflict", Some(msg)),
            Self::Hub(HubError::Validation(msg)) => {
                body(StatusCode::BAD_REQUEST, "invalid request", Some(msg))
            }
            Self::Hub(e) => {
                error!(error = %e, "Request failed");
                body(StatusCode::INTERNAL_SERVER_ERROR, "internal error", None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::DatabaseError;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn authentication_failures_are_indistinguishable() {
        let (s1, b1) = render(
            HubError::MeasurementMismatch {
                attestation_type: "t1".into(),
            }
            .into(),
        )
        .await;
        let (s2, b2) = render(
            HubError::BuilderNotFound {
                ip: "10.0.0.1".into(),
            }
            .into(),
        )
        .await;
        let (s3, b3) = render(ApiError::Forbidden).await;

        assert_eq!(s1, StatusCode::FORBIDDEN);
        assert_eq!((s1, &b1), (s2, &b2));
        assert_eq!((s1, &b1), (s3, &b3));
        assert_eq!(b1, serde_json::json!({"message": "forbidden"}));
    }

    #[tokio::test]
    async fn hub_errors_map_to_status_codes() {
        let cases = [
            (HubError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                HubError::PreconditionFailed("x".into()),
                StatusCode::PRECONDITION_FAILED,
            ),
            (HubError::Conflict("x".into()), StatusCode::CONFLICT),
            (HubError::Validation("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let (status, body) = render(err.into()).await;
            assert_eq!(status, expected);
            assert_eq!(body["error"], "x");
        }
    }

    #[tokio::test]
    async fn store_errors_are_not_leaked() {
        let (status, body) = render(
            HubError::Store(DatabaseError::Query("disk I/O error at /var/db".into())).into(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("error").is_none());
        assert!(!body.to_string().contains("/var/db"));
    }
}
