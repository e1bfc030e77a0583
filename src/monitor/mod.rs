//! Monitoring orchestration
//!
//! [`CycleRunner`] runs the pipeline once for one search;
//! [`MonitoringScheduler`] decides when, per tier.

pub mod cycle;
pub mod scheduler;

pub use cycle::CycleRunner;
pub use scheduler::{MonitoringScheduler, TierRunReport};
