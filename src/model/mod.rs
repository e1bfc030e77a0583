//! Domain types shared by every stage of the pipeline
//!
//! - [`SearchCriteria`]: a user's saved search, input to the query builder
//! - [`RawListing`]: unvalidated extraction output, lives for one cycle
//! - [`Vehicle`]: the canonical record that is deduplicated and persisted
//! - [`MonitoringCycle`]: statistics and status of one pipeline run

mod criteria;
mod cycle;
mod enums;
mod listing;
mod vehicle;

pub use criteria::{CriteriaFile, CriteriaSpec, SearchCriteria, DEFAULT_POLLING_INTERVAL_MINUTES};
pub use cycle::{CycleStatus, MonitoringCycle};
pub use enums::{Category, Condition, Fuel, Gearbox, SellerType, Urgency};
pub use listing::RawListing;
pub use vehicle::Vehicle;
