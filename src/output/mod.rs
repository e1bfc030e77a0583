//! Reporting over the monitoring database

pub mod stats;

pub use stats::{load_statistics, print_statistics, MonitoringStatistics};
