//! One monitoring cycle for one search
//!
//! build query → fetch pages → extract → normalize → classify →
//! persist and notify → record the cycle result.
//!
//! Failures never escape: a failed or refused fetch is recorded on the
//! search (which stays active) and returned as the cycle's status.

use crate::dedup::{classify, Classification, DeduplicationIndex};
use crate::extract::Extractor;
use crate::fetch::{FetchError, FetchedPage, Fetcher};
use crate::model::{CycleStatus, MonitoringCycle, SearchCriteria, Urgency, Vehicle};
use crate::normalize::Normalizer;
use crate::notify::NotificationDispatcher;
use crate::query::build_query;
use crate::storage::{CriteriaStore, StorageError, VehicleStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs cycles; shared by every task of every tier
pub struct CycleRunner {
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    normalizer: Normalizer,
    criteria: Arc<dyn CriteriaStore>,
    vehicles: Arc<dyn VehicleStore>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl CycleRunner {
    pub fn new(
        fetcher: Arc<Fetcher>,
        extractor: Arc<Extractor>,
        criteria: Arc<dyn CriteriaStore>,
        vehicles: Arc<dyn VehicleStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            normalizer: Normalizer::new(),
            criteria,
            vehicles,
            notifier,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn fetcher(&self) -> &Arc<Fetcher> {
        &self.fetcher
    }

    pub fn criteria_store(&self) -> &Arc<dyn CriteriaStore> {
        &self.criteria
    }

    pub fn vehicle_store(&self) -> &Arc<dyn VehicleStore> {
        &self.vehicles
    }

    /// Runs one cycle and records its result on the search
    pub async fn run(
        &self,
        search: &SearchCriteria,
        tier: &str,
        urgency: Urgency,
        cancel: &CancellationToken,
    ) -> MonitoringCycle {
        let mut cycle = MonitoringCycle::start(search.id, tier);
        tracing::debug!("Cycle {} started for search {} ({})", cycle.id, search.id, search.name);

        let query = build_query(search);
        match self.fetcher.fetch_all(&query, &self.extractor, cancel).await {
            Ok(pages) => {
                cycle.pages_fetched = pages.len() as u32;
                match self.process(search, urgency, &pages, &mut cycle).await {
                    Ok(()) => cycle.finish(CycleStatus::Completed, None),
                    Err(e) => {
                        tracing::error!("Storage failed during cycle {}: {}", cycle.id, e);
                        cycle.finish(CycleStatus::Failed, Some(e.to_string()));
                    }
                }
            }
            Err(e) => {
                let status = fetch_failure_status(&e);
                if let FetchError::Aborted { pages_fetched } = &e {
                    cycle.pages_fetched = *pages_fetched;
                }
                match status {
                    CycleStatus::Aborted => {
                        tracing::info!("Cycle {} for search {} aborted", cycle.id, search.id)
                    }
                    _ => tracing::warn!("Cycle for search {} failed: {}", search.id, e),
                }
                cycle.finish(status, Some(e.to_string()));
            }
        }

        if let Err(e) = self.criteria.record_cycle_result(search.id, &cycle).await {
            tracing::error!(
                "Failed to record cycle {} for search {}: {}",
                cycle.id,
                search.id,
                e
            );
        }

        tracing::info!(
            "Search {} [{}]: {} page(s), {} found, {} new, {} notified",
            search.id,
            cycle.status,
            cycle.pages_fetched,
            cycle.vehicles_found,
            cycle.vehicles_new,
            cycle.vehicles_notified
        );
        cycle
    }

    async fn process(
        &self,
        search: &SearchCriteria,
        urgency: Urgency,
        pages: &[FetchedPage],
        cycle: &mut MonitoringCycle,
    ) -> Result<(), StorageError> {
        for listing in pages.iter().flat_map(|fetched| fetched.page.listings.iter()) {
            let mut vehicle = self.normalizer.normalize(listing);
            vehicle.cycle_id = Some(cycle.id.clone());
            cycle.vehicles_found += 1;

            let index = self.vehicles.candidate_index(&vehicle).await?;
            let notify = self
                .persist(search, &index, &vehicle, &cycle.id, &mut cycle.vehicles_new)
                .await?;
            if notify {
                self.notifier.notify(&search.user_id, &vehicle, urgency).await;
                cycle.vehicles_notified += 1;
            }
        }

        Ok(())
    }

    /// Stores one vehicle according to its classification; returns whether
    /// the owner should be notified
    async fn persist(
        &self,
        search: &SearchCriteria,
        index: &DeduplicationIndex,
        vehicle: &Vehicle,
        cycle_id: &str,
        vehicles_new: &mut u32,
    ) -> Result<bool, StorageError> {
        match classify(vehicle, index) {
            Classification::New => {
                self.vehicles.upsert(vehicle).await?;
                *vehicles_new += 1;
                self.vehicles
                    .record_sighting(search.id, &vehicle.id, cycle_id)
                    .await?;
                Ok(true)
            }
            Classification::Duplicate { existing_id } => {
                self.vehicles.mark_seen(&existing_id, vehicle.last_seen).await?;
                let first_for_search = self
                    .vehicles
                    .record_sighting(search.id, &existing_id, cycle_id)
                    .await?;
                Ok(first_for_search)
            }
            Classification::NearDuplicate { existing_id } => {
                let seen_before = self.vehicles.has_sighting(search.id, &existing_id).await?;
                self.vehicles.upsert(vehicle).await?;
                self.vehicles
                    .record_sighting(search.id, &vehicle.id, cycle_id)
                    .await?;
                tracing::debug!(
                    "{} looks like a relisting of {}{}",
                    vehicle.id,
                    existing_id,
                    if seen_before { ", already reported" } else { "" }
                );
                Ok(!seen_before)
            }
        }
    }
}

fn fetch_failure_status(error: &FetchError) -> CycleStatus {
    if error.is_compliance() {
        CycleStatus::ComplianceDisallowed
    } else if error.is_aborted() {
        CycleStatus::Aborted
    } else {
        CycleStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{
        BrowsingContext, LoadOutcome, PageSource, ProxyIdentity, ProxyRotator, RecordingSleeper,
        ResourcePool, RetryPolicy,
    };
    use crate::robots::AllowAll;
    use crate::storage::SqliteStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// Serves the same body for every request
    struct StaticSource(LoadOutcome);

    #[async_trait]
    impl PageSource for StaticSource {
        async fn load(
            &self,
            _context: &BrowsingContext,
            _url: &Url,
            _proxy: Option<&ProxyIdentity>,
        ) -> LoadOutcome {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, Urgency)>>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingNotifier {
        async fn notify(&self, user_id: &str, vehicle: &Vehicle, urgency: Urgency) {
            self.sent
                .lock()
                .unwrap()
                .push((user_id.to_string(), vehicle.id.clone(), urgency));
        }
    }

    const PAGE: &str = r#"
        <html><body>
          <article class="result-item" data-listing-id="1">
            <h2>BMW 320d Touring</h2>
            <a class="result-link" href="/d/1">details</a>
            <span class="result-price">24.990 €</span>
            <div class="result-specs">EZ 03/2019 • 45.000 km • 140 kW (190 PS) • Diesel • Automatik</div>
          </article>
          <article class="result-item" data-listing-id="2">
            <h2>BMW 330i</h2>
            <a class="result-link" href="/d/2">details</a>
            <span class="result-price">31.500 €</span>
            <div class="result-specs">EZ 06/2020 • 20.000 km • Benzin</div>
          </article>
        </body></html>
    "#;

    /// The first card of `PAGE` relisted under a new URL, slightly cheaper
    /// to buy and slightly more driven
    const RELISTED: &str = r#"
        <html><body>
          <article class="result-item" data-listing-id="7">
            <h2>BMW 320d Touring</h2>
            <a class="result-link" href="/d/7">details</a>
            <span class="result-price">25.490 €</span>
            <div class="result-specs">EZ 03/2019 • 47.000 km • 140 kW (190 PS) • Diesel • Automatik</div>
          </article>
        </body></html>
    "#;

    fn success() -> LoadOutcome {
        page(PAGE)
    }

    fn page(body: &str) -> LoadOutcome {
        LoadOutcome::Success {
            body: body.to_string(),
            final_url: Url::parse("https://cars.example.com/search").unwrap(),
        }
    }

    fn runner(
        outcome: LoadOutcome,
        store: Arc<SqliteStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> CycleRunner {
        let fetcher = Fetcher::new(
            Arc::new(ResourcePool::with_contexts(1, Duration::ZERO)),
            Arc::new(ProxyRotator::direct()),
            Arc::new(StaticSource(outcome)),
            Arc::new(AllowAll),
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::ZERO,
            },
            Url::parse("https://cars.example.com/search").unwrap(),
            10,
        )
        .with_sleeper(Arc::new(RecordingSleeper::new()));

        CycleRunner::new(
            Arc::new(fetcher),
            Arc::new(Extractor::default()),
            store.clone(),
            store,
            notifier,
        )
    }

    async fn stored_search(store: &SqliteStore, name: &str) -> SearchCriteria {
        let id = store
            .upsert_criteria(&SearchCriteria::new("user-1", name, "high"))
            .await
            .unwrap();
        store.get_criteria(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_new_vehicles_are_stored_and_notified() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(success(), store.clone(), notifier.clone());
        let search = stored_search(&store, "bmw").await;

        let cycle = runner
            .run(&search, "high", Urgency::Immediate, &CancellationToken::new())
            .await;

        assert_eq!(cycle.status, CycleStatus::Completed);
        assert_eq!(cycle.pages_fetched, 1);
        assert_eq!(cycle.vehicles_found, 2);
        assert_eq!(cycle.vehicles_new, 2);
        assert_eq!(cycle.vehicles_notified, 2);
        assert_eq!(store.count_vehicles().unwrap(), 2);

        let sent = notifier.sent.lock().unwrap().clone();
        assert!(sent
            .iter()
            .all(|(user, _, urgency)| user == "user-1" && *urgency == Urgency::Immediate));
    }

    #[tokio::test]
    async fn test_second_cycle_notifies_nothing_but_records_run() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(success(), store.clone(), notifier.clone());
        let search = stored_search(&store, "bmw").await;

        runner
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        let second = runner
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;

        assert_eq!(second.status, CycleStatus::Completed);
        assert_eq!(second.vehicles_found, 2);
        assert_eq!(second.vehicles_new, 0);
        assert_eq!(second.vehicles_notified, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        assert_eq!(store.cycles_for_search(search.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_vehicle_found_by_another_search_is_reported_once() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(success(), store.clone(), notifier.clone());
        let first = stored_search(&store, "first").await;
        let second = stored_search(&store, "second").await;

        runner
            .run(&first, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        let cycle = runner
            .run(&second, "high", Urgency::Normal, &CancellationToken::new())
            .await;

        assert_eq!(cycle.vehicles_new, 0);
        assert_eq!(cycle.vehicles_notified, 2);

        let again = runner
            .run(&second, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        assert_eq!(again.vehicles_notified, 0);
    }

    #[tokio::test]
    async fn test_blocked_fetch_fails_cycle_but_keeps_search_active() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(
            LoadOutcome::Blocked { status: Some(403) },
            store.clone(),
            notifier,
        );
        let search = stored_search(&store, "bmw").await;

        let cycle = runner
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        assert_eq!(cycle.status, CycleStatus::Failed);
        assert!(cycle.error.is_some());

        let stored = store.get_criteria(search.id).await.unwrap().unwrap();
        assert!(stored.active);
        assert!(stored.last_run_at.is_some());
        assert_eq!(stored.last_status, Some(CycleStatus::Failed));
    }

    #[tokio::test]
    async fn test_cancelled_cycle_is_aborted() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(success(), store.clone(), notifier.clone());
        let search = stored_search(&store, "bmw").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let cycle = runner.run(&search, "high", Urgency::Normal, &cancel).await;

        assert_eq!(cycle.status, CycleStatus::Aborted);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relisting_of_seen_vehicle_is_stored_quietly() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let search = stored_search(&store, "bmw").await;

        runner(success(), store.clone(), notifier.clone())
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        let cycle = runner(page(RELISTED), store.clone(), notifier.clone())
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;

        assert_eq!(cycle.status, CycleStatus::Completed);
        assert_eq!(cycle.vehicles_found, 1);
        assert_eq!(cycle.vehicles_new, 0);
        assert_eq!(cycle.vehicles_notified, 0);
        assert_eq!(store.count_vehicles().unwrap(), 3);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_relisting_seen_only_by_another_search_is_reported() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let first = stored_search(&store, "first").await;
        let second = stored_search(&store, "second").await;

        runner(success(), store.clone(), notifier.clone())
            .run(&first, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        let relisted = runner(page(RELISTED), store.clone(), notifier.clone());
        let cycle = relisted
            .run(&second, "high", Urgency::Normal, &CancellationToken::new())
            .await;

        assert_eq!(cycle.vehicles_new, 0);
        assert_eq!(cycle.vehicles_notified, 1);
        assert_eq!(store.count_vehicles().unwrap(), 3);

        let again = relisted
            .run(&second, "high", Urgency::Normal, &CancellationToken::new())
            .await;
        assert_eq!(again.vehicles_notified, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_is_due_one_interval_after_cycle_start() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = runner(success(), store.clone(), notifier);
        let search = stored_search(&store, "bmw").await;

        let cycle = runner
            .run(&search, "high", Urgency::Normal, &CancellationToken::new())
            .await;

        let stored = store.get_criteria(search.id).await.unwrap().unwrap();
        let interval = chrono::Duration::minutes(i64::from(stored.polling_interval_minutes));
        assert!(stored.last_run_at <= Some(cycle.started_at));
        assert!(stored.is_due(cycle.started_at + interval));
    }
}
