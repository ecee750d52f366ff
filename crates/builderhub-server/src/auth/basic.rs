//! HTTP Basic auth for the admin API.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use super::password::verify_password;

/// Admin user name and argon2 hash of its password.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub user: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub enum AdminAuth {
    /// Every request is allowed. Local development only.
    Disabled,
    Basic(AdminCredentials),
}

/// Extract `(user, password)` from a `Basic` authorization header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

impl AdminAuth {
    /// Whether the request carries valid admin credentials.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        let Self::Basic(expected) = self else {
            return true;
        };
        let Some((user, password)) = basic_credentials(headers) else {
            return false;
        };
        if user != expected.user {
            return false;
        }
        match verify_password(&password, &expected.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "Admin password hash is malformed");
                false
            }
        }
    }
}
