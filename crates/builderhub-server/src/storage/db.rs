//! SQLite database for BuilderHub.

pub use builderhub_core::db::DatabaseError;

builderhub_core::define_database!(HubDatabase, "Hub database migrations complete");
