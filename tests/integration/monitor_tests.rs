//! End-to-end monitoring cycles against a mock catalog

use crate::common::{add_search, mount_robots, result_card, result_page, test_config};
use auto_alert::fetch::ResourcePool;
use auto_alert::model::CycleStatus;
use auto_alert::notify::OutboxNotifier;
use auto_alert::storage::{open_store, CriteriaStore, SqliteStore};
use auto_alert::MonitoringScheduler;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer, dir: &TempDir, max_retries: u32) -> (MonitoringScheduler, Arc<SqliteStore>) {
    let db_path = dir.path().join("alerts.db");
    let config = test_config(&server.uri(), &db_path, max_retries);
    let store = Arc::new(open_store(&db_path).expect("Failed to open store"));
    let notifier = Arc::new(OutboxNotifier::new(Arc::clone(&store)));
    let scheduler = MonitoringScheduler::from_config(&config, Arc::clone(&store), notifier)
        .expect("Failed to build scheduler");
    (scheduler, store)
}

#[tokio::test]
async fn test_full_cycle_across_pages() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    // page 2 is mounted first so it wins over the catch-all below
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageNumber", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(
            &[result_card(3, "Audi A4 Avant", "18.900 €", "EZ 01/2017 • 98.000 km • Diesel")],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(
            &[
                result_card(1, "BMW 320d Touring", "24.990 €", "EZ 03/2019 • 45.000 km • Diesel"),
                result_card(2, "Opel Corsa", "9.500 €", "EZ 05/2016 • 70.000 km • Benzin"),
            ],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 3);
    let search = add_search(&store, "anything", true).await;

    let report = scheduler.run_tier_once("high").await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(report.selected, 1);
    let cycle = &report.cycles[0];
    assert_eq!(cycle.status, CycleStatus::Completed);
    assert_eq!(cycle.pages_fetched, 2);
    assert_eq!(cycle.vehicles_found, 3);
    assert_eq!(cycle.vehicles_new, 3);
    assert_eq!(cycle.vehicles_notified, 3);

    assert_eq!(store.count_vehicles().unwrap(), 3);
    let pending = store.pending_notifications().unwrap();
    assert_eq!(pending.len(), 3);
    assert!(pending.iter().all(|(user, _, urgency, _)| user == "user-1" && urgency == "immediate"));

    let stored = store.get_criteria(search.id).await.unwrap().unwrap();
    assert!(stored.last_run_at.is_some());
    assert_eq!(stored.last_status, Some(CycleStatus::Completed));
    assert_eq!(store.cycles_for_search(search.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_compliance_disallowed_fetches_nothing() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /search").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&[], 1)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 3);
    let search = add_search(&store, "anything", true).await;

    let report = scheduler.run_tier_once("high").await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].status, CycleStatus::ComplianceDisallowed);
    assert_eq!(report.cycles[0].pages_fetched, 0);

    let cycles = store.cycles_for_search(search.id).unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].status, CycleStatus::ComplianceDisallowed);
    assert!(store.get_criteria(search.id).await.unwrap().unwrap().active);
}

#[tokio::test]
async fn test_always_blocked_is_attempted_max_retries_times() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 3);
    let search = add_search(&store, "anything", true).await;

    let report = scheduler.run_tier_once("high").await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(report.cycles[0].status, CycleStatus::Failed);
    let stored = store.get_criteria(search.id).await.unwrap().unwrap();
    assert!(stored.active);
    assert_eq!(stored.last_status, Some(CycleStatus::Failed));
    assert!(stored.last_error.is_some());
}

#[tokio::test]
async fn test_block_marker_counts_as_blocked() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><div id=\"captcha-challenge\"></div></html>"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 2);
    add_search(&store, "anything", true).await;

    let report = scheduler.run_tier_once("high").await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(report.cycles[0].status, CycleStatus::Failed);
    assert_eq!(store.count_vehicles().unwrap(), 0);
}

#[tokio::test]
async fn test_inactive_search_is_never_cycled() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&[], 1)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 3);
    let search = add_search(&store, "paused", false).await;

    let report = scheduler.run_tier_once("high").await.unwrap();
    scheduler.shutdown().await;

    assert_eq!(report.selected, 0);
    assert!(report.cycles.is_empty());
    assert!(store.list_active("high").await.unwrap().is_empty());
    assert!(store.cycles_for_search(search.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_aborts_at_page_boundary() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageNumber", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(result_page(&[], 3))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("pageNumber", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&[], 3)))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(result_page(&[], 3)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (scheduler, store) = setup(&server, &dir, 3);
    let search = add_search(&store, "anything", true).await;

    let running = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_tier_once("high").await })
    };

    // wait until page 2 is in flight
    for _ in 0..200 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests
            .iter()
            .any(|request| request.url.query().is_some_and(|q| q.contains("pageNumber=2")))
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    scheduler.shutdown().await;
    let report = running.await.unwrap().unwrap();

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].status, CycleStatus::Aborted);
    assert_eq!(report.cycles[0].pages_fetched, 2);
    let stored = store.get_criteria(search.id).await.unwrap().unwrap();
    assert_eq!(stored.last_status, Some(CycleStatus::Aborted));
}

#[tokio::test]
async fn test_pool_spaces_dispatches() {
    let delay = Duration::from_millis(50);
    let pool = ResourcePool::with_contexts(3, delay);

    let start = Instant::now();
    for _ in 0..5 {
        let slot = pool.acquire().await.unwrap();
        drop(slot);
    }

    assert!(start.elapsed() >= delay * 4);
}
