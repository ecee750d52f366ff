//! BuilderHub Server Library
//!
//! Attestation-gated configuration, secrets and peer directory service:
//! - SQLite storage for measurements, builders, credentials and configs
//! - Secret store adapters (in-memory, file-backed)
//! - Hub layer: verification, credential lifecycle, config delivery
//! - Admin Basic auth
//! - axum routers for the public, admin and internal APIs

pub mod auth;
pub mod hub;
pub mod secrets;
pub mod server;
pub mod storage;
