//! Storage layer for the disclosure domain
//!
//! SQLite persistence behind an r2d2 connection pool.

pub mod migrations;
pub mod sql_store;

pub use migrations::{migrate, CURRENT_DISCLOSURE_SCHEMA_VERSION};
pub use sql_store::DisclosureSqlStore;
