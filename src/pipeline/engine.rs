//! Refresh engine - orchestration layer for the polling pipeline
//!
//! One engine instance serves one platform; the runtime spawns one polling
//! loop per enabled platform. Per cycle the engine asks the store which
//! entities are tracked, refreshes the stale ones, and leaves the rest
//! untouched. A failed entity never aborts the others.
//!
//! ## Architecture
//!
//! ```text
//! MetricsStore::list_tracked_entities()
//!     ↓
//! RefreshEngine::process_entity()          (per entity)
//!     ↓
//! PlatformClient::fetch_profile() + fetch_recent_posts()
//!     ↓
//! Snapshot::assemble() → aggregate() → AnomalyDetector::is_anomalous()
//!     ↓
//! MetricsStore::persist_refresh()          (one commit per entity)
//! ```

use super::aggregator::aggregate;
use super::client::{PlatformClient, PlatformError};
use super::config::PlatformSettings;
use super::db::{MetricsStore, StoreError};
use super::detector::AnomalyDetector;
use super::retry::ExponentialBackoff;
use super::scheduler::{due_for_refresh, jittered_interval};
use super::types::{current_timestamp, EntityState, MetricsRecord, Platform, Snapshot, TrackedEntity};
use std::sync::Arc;
use std::time::Duration;

/// Failure refreshing one entity
#[derive(Debug)]
pub enum RefreshError {
    Platform(PlatformError),
    Store(StoreError),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::Platform(err) => write!(f, "platform fetch failed: {}", err),
            RefreshError::Store(err) => write!(f, "store operation failed: {}", err),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Platform(err) => Some(err),
            RefreshError::Store(err) => Some(err),
        }
    }
}

impl From<PlatformError> for RefreshError {
    fn from(err: PlatformError) -> Self {
        RefreshError::Platform(err)
    }
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        RefreshError::Store(err)
    }
}

/// What happened to one entity within a cycle
enum EntityOutcome {
    /// Last refresh still within the staleness interval, nothing fetched
    Fresh,
    Refreshed { bot_flag: bool },
}

/// Per-cycle counters, logged after every cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    pub tracked: usize,
    pub fresh: usize,
    pub refreshed: usize,
    pub flagged: usize,
    pub failed: usize,
    /// The tracking list itself could not be read; the cycle did nothing
    pub list_error: bool,
}

/// Polling engine for one platform
pub struct RefreshEngine {
    platform: Platform,
    client: Arc<dyn PlatformClient>,
    store: Arc<dyn MetricsStore>,
    detector: AnomalyDetector,
    settings: PlatformSettings,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl RefreshEngine {
    /// Create an engine on the system clock
    pub fn new(
        platform: Platform,
        client: Arc<dyn PlatformClient>,
        store: Arc<dyn MetricsStore>,
        detector: AnomalyDetector,
        settings: PlatformSettings,
    ) -> Self {
        Self::new_with_timestamp_fn(
            platform,
            client,
            store,
            detector,
            settings,
            Box::new(current_timestamp),
        )
    }

    /// Create an engine with a custom timestamp function
    ///
    /// Used for testing with deterministic timestamps.
    pub fn new_with_timestamp_fn(
        platform: Platform,
        client: Arc<dyn PlatformClient>,
        store: Arc<dyn MetricsStore>,
        detector: AnomalyDetector,
        settings: PlatformSettings,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            platform,
            client,
            store,
            detector,
            settings,
            now_fn,
        }
    }

    /// Refresh one entity if its stored metrics have gone stale
    ///
    /// The staleness decision comes from the store's newest history row, so
    /// a refresh that failed to persist leaves the entity due next cycle.
    async fn process_entity(&self, entity: &TrackedEntity) -> Result<EntityOutcome, RefreshError> {
        let now = (self.now_fn)();

        let last = self
            .store
            .get_last_metrics(entity.entity_id, self.platform)
            .await?;
        let last_refresh = last.as_ref().map(|record| record.timestamp);

        if !due_for_refresh(last_refresh, now, self.settings.staleness_secs) {
            log::debug!("   ├─ {} [{}]: fresh, skipping", self.platform, entity.handle);
            return Ok(EntityOutcome::Fresh);
        }

        let window = self.platform.post_window();
        let profile = self.client.fetch_profile(&entity.handle).await?;
        let posts = self.client.fetch_recent_posts(&entity.handle, window).await?;

        let snapshot = Snapshot::assemble(
            entity.entity_id,
            self.platform,
            now,
            profile,
            posts,
            window,
        );
        let metrics = aggregate(&snapshot, last.as_ref());

        let history = self
            .store
            .get_history(entity.entity_id, self.platform, self.detector.history_window())
            .await?;

        let mut record = MetricsRecord::from_snapshot(&snapshot, &metrics, false);
        record.bot_flag = self.detector.is_anomalous(&history, &record);

        let state = EntityState::from_snapshot(&entity.handle, &snapshot);
        self.store
            .persist_refresh(&record, &state, &snapshot.recent_posts)
            .await?;

        if record.bot_flag {
            log::warn!(
                "⚠️  {} [{}]: flagged as anomalous (followers: {}, total likes: {})",
                self.platform,
                entity.handle,
                record.follower_count,
                record.total_likes
            );
        } else {
            log::info!(
                "✅ {} [{}]: refreshed (followers: {}, avg likes: {})",
                self.platform,
                entity.handle,
                record.follower_count,
                record.avg_likes
            );
        }

        Ok(EntityOutcome::Refreshed {
            bot_flag: record.bot_flag,
        })
    }

    /// Run one polling cycle over every tracked entity
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        let entities = match self.store.list_tracked_entities(self.platform).await {
            Ok(entities) => entities,
            Err(err) => {
                log::error!("❌ {} cycle: could not list tracked entities: {}", self.platform, err);
                summary.list_error = true;
                return summary;
            }
        };

        summary.tracked = entities.len();

        for entity in &entities {
            match self.process_entity(entity).await {
                Ok(EntityOutcome::Fresh) => summary.fresh += 1,
                Ok(EntityOutcome::Refreshed { bot_flag }) => {
                    summary.refreshed += 1;
                    if bot_flag {
                        summary.flagged += 1;
                    }
                }
                Err(err) => {
                    summary.failed += 1;
                    log::warn!(
                        "⚠️  {} [{}]: refresh failed: {}",
                        self.platform,
                        entity.handle,
                        err
                    );
                }
            }
        }

        summary
    }

    /// Polling loop: run cycles until `max_cycles` is reached (None = forever)
    ///
    /// Cycles are spaced by the configured poll interval plus jitter. A
    /// cycle that could not even list its entities backs off exponentially
    /// instead; the loop stops once the backoff budget is spent.
    pub async fn run(&self, max_cycles: Option<u64>) {
        let mut backoff = ExponentialBackoff::new(5, 300, 6);
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            let summary = self.run_cycle().await;

            log::info!(
                "📊 {} cycle {}: {} tracked, {} refreshed, {} fresh, {} flagged, {} failed",
                self.platform,
                cycle,
                summary.tracked,
                summary.refreshed,
                summary.fresh,
                summary.flagged,
                summary.failed
            );

            if let Some(limit) = max_cycles {
                if cycle >= limit {
                    break;
                }
            }

            if summary.list_error {
                if backoff.sleep().await.is_err() {
                    log::error!(
                        "❌ {} loop: store unavailable after repeated retries, stopping",
                        self.platform
                    );
                    break;
                }
                continue;
            }
            backoff.reset();

            let delay = jittered_interval(self.settings.poll_interval_secs);
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }
}
