//! Admin authentication.
//!
//! The admin API is protected by HTTP Basic auth checked against an argon2
//! password hash.

pub mod basic;
pub mod password;

pub use basic::{AdminAuth, AdminCredentials};
