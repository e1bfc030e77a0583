//! Auto-Alert: a listing-monitoring engine for vehicle classifieds
//!
//! This crate turns saved vehicle searches into catalog queries, fetches and
//! parses result pages politely (pooled, rate limited, retried, optionally
//! proxied), normalizes and deduplicates the listings it finds, and runs the
//! whole pipeline on tiered cron schedules across many user searches.

pub mod config;
pub mod dedup;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod monitor;
pub mod normalize;
pub mod notify;
pub mod output;
pub mod query;
pub mod robots;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Auto-Alert operations
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid search criteria: {0}")]
    Criteria(#[from] CriteriaError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector for {field}: {selector}")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("Invalid cron expression for tier '{tier}': {expression}")]
    InvalidCron { tier: String, expression: String },
}

/// Search criteria errors
///
/// These are the only errors allowed to fail fast: a search that cannot be
/// turned into a query is rejected when it is stored or imported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("{field} range is inverted: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    #[error("search '{0}' has no priority tier")]
    MissingTier(String),

    #[error("search '{0}' has no owner")]
    MissingOwner(String),

    #[error("search '{0}' has a zero polling interval")]
    ZeroInterval(String),

    #[error("search '{name}' uses unknown value '{value}' for {field}")]
    UnknownValue {
        name: String,
        field: &'static str,
        value: String,
    },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Auto-Alert operations
pub type Result<T> = std::result::Result<T, AlertError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::{classify, Classification, DeduplicationIndex};
pub use extract::Extractor;
pub use model::{MonitoringCycle, RawListing, SearchCriteria, Vehicle};
pub use monitor::{CycleRunner, MonitoringScheduler};
pub use normalize::Normalizer;
pub use query::{build_query, Query};
