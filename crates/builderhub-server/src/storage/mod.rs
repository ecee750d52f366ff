//! SQLite storage for BuilderHub.
//!
//! Provides persistence for measurements, builders, service credentials,
//! builder configurations and the audit event log.

mod db;
mod models;
mod queries_builders;
mod queries_configs;
mod queries_credentials;
mod queries_events;
mod queries_measurements;


pub use db::{DatabaseError, HubDatabase};
pub use models::*;
pub use queries_builders::NewBuilder;
pub use queries_credentials::NewCredential;
