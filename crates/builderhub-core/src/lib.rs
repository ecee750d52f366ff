//! `BuilderHub` Core Library
//!
//! Shared functionality for `BuilderHub` components:
//! - Measurement templates and register matching
//! - Config/secret overlay (dotted-path merge and flatten)
//! - `SQLite` pool helpers used by the storage layer
//! - Tracing initialisation and common error types

pub mod db;
pub mod error;
pub mod measurement;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod overlay;
pub mod tracing_init;

pub use error::{Error, Result};
pub use measurement::{Measurement, RegisterValue, match_measurement};
pub use overlay::{flatten, merge};
