//! Shared handler state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::auth::AdminAuth;
use crate::hub::BuilderHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: BuilderHub,
    pub admin_auth: Arc<AdminAuth>,
    ready: Arc<AtomicBool>,
    drain_wait: Duration,
}

impl AppState {
    pub fn new(hub: BuilderHub, admin_auth: AdminAuth, drain_wait: Duration) -> Self {
        Self {
            hub,
            admin_auth: Arc::new(admin_auth),
            ready: Arc::new(AtomicBool::new(true)),
            drain_wait,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub const fn drain_wait(&self) -> Duration {
        self.drain_wait
    }
}
