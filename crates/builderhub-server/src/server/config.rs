//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use crate::auth::AdminAuth;

/// Listener addresses and request handling settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Attested public API.
    pub listen_addr: SocketAddr,
    /// Admin API.
    pub admin_addr: SocketAddr,
    /// Internal peer listing.
    pub internal_addr: SocketAddr,
    /// Upper bound on a single request, including store calls.
    pub request_timeout: Duration,
    /// How long `/drain` waits after flipping the ready flag.
    pub drain_wait: Duration,
    pub admin_auth: AdminAuth,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            admin_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            internal_addr: SocketAddr::from(([127, 0, 0, 1], 8082)),
            request_timeout: Duration::from_secs(30),
            drain_wait: Duration::from_secs(15),
            admin_auth: AdminAuth::Disabled,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_drain_wait(mut self, wait: Duration) -> Self {
        self.drain_wait = wait;
        self
    }

    #[must_use]
    pub fn with_admin_auth(mut self, auth: AdminAuth) -> Self {
        self.admin_auth = auth;
        self
    }
}
