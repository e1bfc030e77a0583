//! Storage traits and error types
//!
//! The monitoring pipeline only talks to these traits; [`super::SqliteStore`]
//! is the bundled implementation.

use crate::dedup::DeduplicationIndex;
use crate::model::{MonitoringCycle, SearchCriteria, Vehicle};
use crate::CriteriaError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Search not found: {0}")]
    SearchNotFound(i64),

    #[error("Invalid search: {0}")]
    InvalidCriteria(#[from] CriteriaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Saved searches and their cycle history
#[async_trait]
pub trait CriteriaStore: Send + Sync {
    /// Active searches of one tier, in ID order
    async fn list_active(&self, tier: &str) -> StorageResult<Vec<SearchCriteria>>;

    /// Stores a finished cycle and updates the search's last run, status
    /// and error
    async fn record_cycle_result(
        &self,
        search_id: i64,
        cycle: &MonitoringCycle,
    ) -> StorageResult<()>;

    /// Inserts a search, or updates the one with the same ID (or the same
    /// owner and name); returns its ID
    async fn upsert_criteria(&self, criteria: &SearchCriteria) -> StorageResult<i64>;

    async fn get_criteria(&self, id: i64) -> StorageResult<Option<SearchCriteria>>;

    /// Flips a search to inactive; returns false if it does not exist
    async fn deactivate(&self, id: i64) -> StorageResult<bool>;

    /// Deletes cycle records started before `before`
    async fn prune_cycles(&self, before: DateTime<Utc>) -> StorageResult<usize>;
}

/// Canonical vehicles and which search has seen them
#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn find_by_identity(&self, id: &str) -> StorageResult<Option<Vehicle>>;

    /// Inserts or refreshes a vehicle; `first_seen` and the source cycle of
    /// an existing record are kept, everything else is last-seen-wins.
    /// Returns true when the vehicle was new.
    async fn upsert(&self, vehicle: &Vehicle) -> StorageResult<bool>;

    /// Refreshes `last_seen` only
    async fn mark_seen(&self, id: &str, seen_at: DateTime<Utc>) -> StorageResult<()>;

    /// Index over the stored vehicles `vehicle` could match: same identity,
    /// URL or content hash, or the same make and model
    async fn candidate_index(&self, vehicle: &Vehicle) -> StorageResult<DeduplicationIndex>;

    /// Records that a search saw a vehicle; returns true on the first
    /// sighting
    async fn record_sighting(
        &self,
        search_id: i64,
        vehicle_id: &str,
        cycle_id: &str,
    ) -> StorageResult<bool>;

    async fn has_sighting(&self, search_id: i64, vehicle_id: &str) -> StorageResult<bool>;

    /// Deletes vehicles not seen since `before`, with their sightings
    async fn prune_stale(&self, before: DateTime<Utc>) -> StorageResult<usize>;
}
