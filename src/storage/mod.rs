//! Storage module for persisting searches, vehicles and cycle history
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Saved searches and their last-run state ([`CriteriaStore`])
//! - Canonical vehicles and per-search sightings ([`VehicleStore`])
//! - The notification outbox and statistics queries

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::{timestamp, SqliteStore};
pub use traits::{CriteriaStore, StorageError, StorageResult, VehicleStore};

use std::path::Path;

/// Opens or creates the database, creating parent directories as needed
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteStore::new(path)
}
