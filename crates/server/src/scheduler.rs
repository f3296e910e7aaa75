//! Periodic maintenance: similarity pass, trending refresh and preference
//! rebuilds for recently active shoppers.

use std::sync::Arc;
use std::time::Duration;

use bloom_core::recommend::RecommendationEngine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Shoppers active within this window get their profile rebuilt each cycle.
const PREFERENCE_ACTIVITY_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub similarity_pairs: Option<usize>,
    pub trending_rows: Option<usize>,
    pub preferences_updated: Option<usize>,
    pub failed_jobs: Vec<&'static str>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed_jobs.is_empty()
    }
}

/// Shared view of the scheduler for the health endpoint.
#[derive(Clone, Debug)]
pub struct MaintenanceStatus {
    enabled: bool,
    last_cycle: Arc<RwLock<Option<CycleReport>>>,
}

impl MaintenanceStatus {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, last_cycle: Arc::new(RwLock::new(None)) }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn record(&self, report: CycleReport) {
        *self.last_cycle.write().await = Some(report);
    }

    pub async fn last_cycle(&self) -> Option<CycleReport> {
        self.last_cycle.read().await.clone()
    }
}

pub struct MaintenanceScheduler {
    engine: RecommendationEngine,
    interval: Duration,
    status: MaintenanceStatus,
}

impl MaintenanceScheduler {
    pub fn new(
        engine: RecommendationEngine,
        interval: Duration,
        status: MaintenanceStatus,
    ) -> Self {
        Self { engine, interval, status }
    }

    /// Runs every job once. A failing job is logged and does not stop the
    /// ones after it.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let mut failed_jobs = Vec::new();

        let similarity_pairs = match self.engine.calculate_all_similarities().await {
            Ok(run) => Some(run.pairs_stored),
            Err(error) => {
                warn!(
                    event_name = "maintenance.cycle.job_failed",
                    job = "similarities",
                    error = %error,
                    "similarity pass failed"
                );
                failed_jobs.push("similarities");
                None
            }
        };

        let trending_rows = match self.engine.update_trending_products().await {
            Ok(refreshed) => Some(refreshed.iter().map(|refresh| refresh.rows).sum()),
            Err(error) => {
                warn!(
                    event_name = "maintenance.cycle.job_failed",
                    job = "trending",
                    error = %error,
                    "trending refresh failed"
                );
                failed_jobs.push("trending");
                None
            }
        };

        let active_since = started_at - chrono::Duration::days(PREFERENCE_ACTIVITY_WINDOW_DAYS);
        let preferences_updated =
            match self.engine.refresh_active_user_preferences(active_since).await {
                Ok(updated) => Some(updated),
                Err(error) => {
                    warn!(
                        event_name = "maintenance.cycle.job_failed",
                        job = "preferences",
                        error = %error,
                        "preference refresh failed"
                    );
                    failed_jobs.push("preferences");
                    None
                }
            };

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            similarity_pairs,
            trending_rows,
            preferences_updated,
            failed_jobs,
        };
        info!(
            event_name = "maintenance.cycle.completed",
            similarity_pairs = ?report.similarity_pairs,
            trending_rows = ?report.trending_rows,
            preferences_updated = ?report.preferences_updated,
            failed_jobs = report.failed_jobs.len(),
            "maintenance cycle completed"
        );
        self.status.record(report.clone()).await;
        report
    }

    /// Runs a cycle immediately and then once per interval until `shutdown`
    /// flips to `true` or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                event_name = "maintenance.scheduler.started",
                interval_secs = self.interval.as_secs(),
                "maintenance scheduler started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(event_name = "maintenance.scheduler.stopped", "maintenance scheduler stopped");
        })
    }
}
