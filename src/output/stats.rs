//! Statistics from the monitoring database
//!
//! Backs the `--stats` command.

use crate::model::{CycleStatus, SearchCriteria};
use crate::storage::{SqliteStore, StorageResult};
use chrono::{Duration, Utc};
use std::collections::HashMap;

/// Monitoring statistics summary
#[derive(Debug, Clone, Default)]
pub struct MonitoringStatistics {
    pub active_searches: u64,
    pub inactive_searches: u64,

    /// Active searches per tier
    pub searches_by_tier: Vec<(String, u64)>,

    pub total_vehicles: u64,

    /// Vehicles seen in the last 24 hours
    pub vehicles_seen_today: u64,

    /// Recorded cycles per final status
    pub cycles_by_status: HashMap<CycleStatus, u64>,

    pub pages_fetched: u64,
    pub vehicles_found: u64,
    pub vehicles_new: u64,
    pub vehicles_notified: u64,

    pub pending_notifications: u64,

    /// Active searches whose last cycle did not complete
    pub failing_searches: Vec<SearchCriteria>,
}

impl MonitoringStatistics {
    pub fn total_cycles(&self) -> u64 {
        self.cycles_by_status.values().sum()
    }

    /// Share of recorded cycles that completed, in percent
    pub fn success_rate(&self) -> f64 {
        let total = self.total_cycles();
        if total == 0 {
            return 0.0;
        }
        let completed = self
            .cycles_by_status
            .get(&CycleStatus::Completed)
            .copied()
            .unwrap_or(0);
        (completed as f64 / total as f64) * 100.0
    }
}

/// Loads statistics from storage
pub fn load_statistics(store: &SqliteStore) -> StorageResult<MonitoringStatistics> {
    let (active_searches, inactive_searches) = store.count_searches()?;
    let (pages_fetched, vehicles_found, vehicles_new, vehicles_notified) = store.cycle_totals()?;

    Ok(MonitoringStatistics {
        active_searches,
        inactive_searches,
        searches_by_tier: store.active_searches_by_tier()?,
        total_vehicles: store.count_vehicles()?,
        vehicles_seen_today: store.count_vehicles_seen_since(Utc::now() - Duration::hours(24))?,
        cycles_by_status: store.cycle_status_summary()?,
        pages_fetched,
        vehicles_found,
        vehicles_new,
        vehicles_notified,
        pending_notifications: store.count_pending_notifications()?,
        failing_searches: store.failing_searches()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MonitoringStatistics) {
    println!("=== Monitoring Statistics ===\n");

    println!("Searches:");
    println!("  Active: {}", stats.active_searches);
    println!("  Inactive: {}", stats.inactive_searches);
    for (tier, count) in &stats.searches_by_tier {
        println!("    {}: {}", tier, count);
    }
    println!();

    println!("Vehicles:");
    println!("  Known: {}", stats.total_vehicles);
    println!("  Seen in the last 24h: {}", stats.vehicles_seen_today);
    println!();

    println!("Cycles ({}):", stats.total_cycles());
    let mut status_counts: Vec<_> = stats.cycles_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (status, count) in status_counts {
        println!("  {}: {}", status, count);
    }
    println!("  Pages fetched: {}", stats.pages_fetched);
    println!(
        "  Listings: {} found, {} new, {} notified",
        stats.vehicles_found, stats.vehicles_new, stats.vehicles_notified
    );
    println!();

    println!("Pending notifications: {}", stats.pending_notifications);
    println!();

    if !stats.failing_searches.is_empty() {
        println!("Failing Searches ({}):", stats.failing_searches.len());
        for search in &stats.failing_searches {
            println!(
                "  - #{} {} [{}]: {}",
                search.id,
                search.name,
                search
                    .last_status
                    .map(|status| status.to_db_string())
                    .unwrap_or("unknown"),
                search.last_error.as_deref().unwrap_or("no error recorded")
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} cycles)",
        stats.success_rate(),
        stats.total_cycles()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MonitoringCycle;
    use crate::storage::CriteriaStore;

    #[test]
    fn test_success_rate() {
        let mut stats = MonitoringStatistics::default();
        assert_eq!(stats.success_rate(), 0.0);

        stats.cycles_by_status.insert(CycleStatus::Completed, 3);
        stats.cycles_by_status.insert(CycleStatus::Failed, 1);
        assert_eq!(stats.total_cycles(), 4);
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_load_statistics() {
        let store = SqliteStore::new_in_memory().unwrap();
        let id = store
            .upsert_criteria(&SearchCriteria::new("user-1", "golf", "high"))
            .await
            .unwrap();
        let mut inactive = SearchCriteria::new("user-1", "polo", "low");
        inactive.active = false;
        store.upsert_criteria(&inactive).await.unwrap();

        let mut cycle = MonitoringCycle::start(id, "high");
        cycle.pages_fetched = 2;
        cycle.finish(CycleStatus::Failed, Some("blocked".to_string()));
        store.record_cycle_result(id, &cycle).await.unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.active_searches, 1);
        assert_eq!(stats.inactive_searches, 1);
        assert_eq!(stats.searches_by_tier, vec![("high".to_string(), 1)]);
        assert_eq!(stats.pages_fetched, 2);
        assert_eq!(stats.cycles_by_status.get(&CycleStatus::Failed), Some(&1));
        assert_eq!(stats.failing_searches.len(), 1);
        assert_eq!(stats.failing_searches[0].last_error.as_deref(), Some("blocked"));

        print_statistics(&stats);
    }
}
