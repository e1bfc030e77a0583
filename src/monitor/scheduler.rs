//! Tiered cron scheduling
//!
//! Each configured tier owns one cron job. When it fires, every active and
//! due search of the tier gets one cycle, spawned concurrently but bounded by
//! `max-concurrent-cycles` across all tiers. A search whose previous cycle
//! is still running is skipped until the next firing.

use crate::config::{Config, TierConfig, TierKind};
use crate::extract::Extractor;
use crate::fetch::{Fetcher, HttpPageSource};
use crate::model::MonitoringCycle;
use crate::monitor::cycle::CycleRunner;
use crate::notify::NotificationDispatcher;
use crate::robots::compliance_for;
use crate::storage::{CriteriaStore, SqliteStore, VehicleStore};
use crate::AlertError;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, Semaphore};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Searches that become due within this many seconds of a firing run in
/// that firing
const DUE_SLACK_SECONDS: i64 = 30;

/// What one firing of a tier did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierRunReport {
    pub tier: String,
    /// Due searches a cycle was started for
    pub selected: usize,
    /// Due searches skipped because their previous cycle is still running
    pub skipped: usize,
    pub cycles: Vec<MonitoringCycle>,
    pub pruned_vehicles: usize,
    pub pruned_cycles: usize,
}

/// Drives every tier; cheap to clone
#[derive(Clone)]
pub struct MonitoringScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    tiers: Vec<TierConfig>,
    runner: CycleRunner,
    in_flight: StdMutex<HashSet<i64>>,
    cycle_slots: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    cron: Mutex<Option<JobScheduler>>,
}

/// Removes a search from the in-flight set when its task ends
struct InFlightGuard {
    inner: Arc<Inner>,
    search_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.inner.in_flight.lock() {
            in_flight.remove(&self.search_id);
        }
    }
}

impl MonitoringScheduler {
    pub fn new(tiers: Vec<TierConfig>, runner: CycleRunner, max_concurrent_cycles: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                tiers,
                runner,
                in_flight: StdMutex::new(HashSet::new()),
                cycle_slots: Arc::new(Semaphore::new(max_concurrent_cycles.max(1))),
                tracker: TaskTracker::new(),
                cancel: CancellationToken::new(),
                cron: Mutex::new(None),
            }),
        }
    }

    /// Wires the full pipeline from configuration
    pub fn from_config(
        config: &Config,
        store: Arc<SqliteStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> crate::Result<Self> {
        let source = Arc::new(HttpPageSource::from_config(config));
        let compliance = compliance_for(config)?;
        let fetcher = Fetcher::from_config(config, source, compliance)?;
        let extractor = Extractor::new(&config.target.selectors)?;

        let runner = CycleRunner::new(
            Arc::new(fetcher),
            Arc::new(extractor),
            store.clone(),
            store,
            notifier,
        );

        Ok(Self::new(
            config.tier.clone(),
            runner,
            config.engine.max_concurrent_cycles,
        ))
    }

    pub fn tiers(&self) -> &[TierConfig] {
        &self.inner.tiers
    }

    pub fn runner(&self) -> &CycleRunner {
        &self.inner.runner
    }

    /// Number of searches with a cycle currently running
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.len())
            .unwrap_or(0)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Runs one firing of a tier and waits for its cycles
    pub async fn run_tier_once(&self, name: &str) -> crate::Result<TierRunReport> {
        let tier = self
            .inner
            .tiers
            .iter()
            .find(|tier| tier.name == name)
            .ok_or_else(|| AlertError::UnknownTier(name.to_string()))?;

        let mut report = TierRunReport {
            tier: tier.name.clone(),
            ..TierRunReport::default()
        };

        if self.is_shutting_down() {
            tracing::debug!("Shutting down, tier {} not run", tier.name);
            return Ok(report);
        }

        match tier.kind {
            TierKind::Monitor => self.run_monitor_tier(tier, &mut report).await?,
            TierKind::Cleanup => self.run_cleanup_tier(tier, &mut report).await?,
        }

        Ok(report)
    }

    async fn run_monitor_tier(
        &self,
        tier: &TierConfig,
        report: &mut TierRunReport,
    ) -> crate::Result<()> {
        let searches = self
            .inner
            .runner
            .criteria_store()
            .list_active(&tier.name)
            .await?;
        let now = Utc::now() + ChronoDuration::seconds(DUE_SLACK_SECONDS);
        let urgency = tier.urgency();

        let mut handles = Vec::new();
        for search in searches.into_iter().filter(|search| search.is_due(now)) {
            let Some(guard) = self.claim(search.id) else {
                tracing::debug!("Search {} still running, skipped", search.id);
                report.skipped += 1;
                continue;
            };
            report.selected += 1;

            let inner = Arc::clone(&self.inner);
            let tier_name = tier.name.clone();
            handles.push(self.inner.tracker.spawn(async move {
                let _guard = guard;
                let _permit = tokio::select! {
                    permit = Arc::clone(&inner.cycle_slots).acquire_owned() => permit.ok()?,
                    _ = inner.cancel.cancelled() => return None,
                };
                Some(
                    inner
                        .runner
                        .run(&search, &tier_name, urgency, &inner.cancel)
                        .await,
                )
            }));
        }

        tracing::info!(
            "Tier {}: {} search(es) due, {} still running",
            tier.name,
            report.selected,
            report.skipped
        );

        for handle in handles {
            match handle.await {
                Ok(Some(cycle)) => report.cycles.push(cycle),
                Ok(None) => {}
                Err(e) => tracing::error!("Cycle task in tier {} failed: {}", tier.name, e),
            }
        }

        Ok(())
    }

    async fn run_cleanup_tier(
        &self,
        tier: &TierConfig,
        report: &mut TierRunReport,
    ) -> crate::Result<()> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(tier.retain_days));
        let runner = &self.inner.runner;

        report.pruned_vehicles = runner.vehicle_store().prune_stale(cutoff).await?;
        report.pruned_cycles = runner.criteria_store().prune_cycles(cutoff).await?;

        tracing::info!(
            "Tier {}: pruned {} vehicle(s) and {} cycle record(s) older than {} day(s)",
            tier.name,
            report.pruned_vehicles,
            report.pruned_cycles,
            tier.retain_days
        );
        Ok(())
    }

    fn claim(&self, search_id: i64) -> Option<InFlightGuard> {
        let mut in_flight = self.inner.in_flight.lock().ok()?;
        if !in_flight.insert(search_id) {
            return None;
        }
        Some(InFlightGuard {
            inner: Arc::clone(&self.inner),
            search_id,
        })
    }

    /// Registers one cron job per tier and starts the clock
    pub async fn start(&self) -> crate::Result<()> {
        let mut cron = self.inner.cron.lock().await;
        if cron.is_some() {
            return Ok(());
        }

        let sched = JobScheduler::new().await?;
        for tier in &self.inner.tiers {
            let this = self.clone();
            let name = tier.name.clone();
            let job = Job::new_async(tier.cron.as_str(), move |_uuid, _lock| {
                let this = this.clone();
                let name = name.clone();
                Box::pin(async move {
                    match this.run_tier_once(&name).await {
                        Ok(report) => tracing::debug!(
                            "Tier {} finished: {} cycle(s)",
                            name,
                            report.cycles.len()
                        ),
                        Err(e) => tracing::error!("Tier {} failed: {}", name, e),
                    }
                })
            })?;
            sched.add(job).await?;
            tracing::info!("Scheduled tier {} ({})", tier.name, tier.cron);
        }

        sched.start().await?;
        *cron = Some(sched);
        Ok(())
    }

    /// Stops the cron clock, cancels running cycles and waits for them
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down scheduler");
        self.inner.cancel.cancel();

        if let Some(mut sched) = self.inner.cron.lock().await.take() {
            if let Err(e) = sched.shutdown().await {
                tracing::warn!("Cron scheduler did not stop cleanly: {}", e);
            }
        }

        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.runner.fetcher().pool().close();
        tracing::info!("Scheduler stopped");
    }
}
