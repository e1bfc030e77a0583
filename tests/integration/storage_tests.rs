//! Persistence across store instances

use auto_alert::model::{CriteriaFile, CycleStatus, MonitoringCycle};
use auto_alert::output::load_statistics;
use auto_alert::storage::{open_store, CriteriaStore, VehicleStore};
use auto_alert::Vehicle;
use chrono::Utc;
use tempfile::TempDir;

const SEARCHES: &str = r#"
[[search]]
user = "user-1"
name = "family estate"
tier = "high"
make = "Volkswagen"
model = "Passat"
price-max = 25000
fuel = "Diesel"
polling-interval = 5

[[search]]
user = "user-2"
name = "city car"
tier = "low"
make = "Fiat"
active = false
"#;

#[tokio::test]
async fn test_imported_searches_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("alerts.db");

    {
        let store = open_store(&db_path).unwrap();
        let file: CriteriaFile = toml::from_str(SEARCHES).unwrap();
        for spec in file.search {
            let criteria = spec.into_criteria().unwrap();
            store.upsert_criteria(&criteria).await.unwrap();
        }
    }

    let store = open_store(&db_path).unwrap();
    let active = store.list_active("high").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "family estate");
    assert_eq!(active[0].price_max, Some(25_000));
    assert_eq!(active[0].polling_interval_minutes, 5);
    assert!(store.list_active("low").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reimport_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir.path().join("alerts.db")).unwrap();

    let file: CriteriaFile = toml::from_str(SEARCHES).unwrap();
    let first = file.search[0].clone().into_criteria().unwrap();
    let id = store.upsert_criteria(&first).await.unwrap();

    let mut changed = first.clone();
    changed.price_max = Some(20_000);
    assert_eq!(store.upsert_criteria(&changed).await.unwrap(), id);

    let stored = store.get_criteria(id).await.unwrap().unwrap();
    assert_eq!(stored.price_max, Some(20_000));
}

#[tokio::test]
async fn test_statistics_over_file_database() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir.path().join("alerts.db")).unwrap();

    let file: CriteriaFile = toml::from_str(SEARCHES).unwrap();
    let criteria = file.search[0].clone().into_criteria().unwrap();
    let id = store.upsert_criteria(&criteria).await.unwrap();

    let vehicle = Vehicle::new("vw-1", "VW Passat Variant", Utc::now());
    store.upsert(&vehicle).await.unwrap();
    store.record_sighting(id, "vw-1", "cycle-1").await.unwrap();

    let mut cycle = MonitoringCycle::start(id, "high");
    cycle.pages_fetched = 1;
    cycle.vehicles_found = 1;
    cycle.vehicles_new = 1;
    cycle.finish(CycleStatus::Completed, None);
    store.record_cycle_result(id, &cycle).await.unwrap();

    let stats = load_statistics(&store).unwrap();
    assert_eq!(stats.active_searches, 1);
    assert_eq!(stats.total_vehicles, 1);
    assert_eq!(stats.vehicles_seen_today, 1);
    assert_eq!(stats.vehicles_new, 1);
    assert!(stats.failing_searches.is_empty());
    assert!((stats.success_rate() - 100.0).abs() < f64::EPSILON);
}
