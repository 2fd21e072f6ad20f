use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use plexwatch_config::MAX_BATCH_SIZE;
use plexwatch_models::{MatchResult, NotificationPayload, TrackedEntry, WatchlistEntry};
use plexwatch_sources::{FeedSource, LibraryService, Notifier, SecondaryMetadataService};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::context::{CycleContext, MatchSettings};
use crate::feeds::fetch_watchlist;
use crate::orchestrator::MatchOrchestrator;
use crate::progress::{log_summary, CycleStats, ProgressTracker};
use crate::state_store::StateStore;
use crate::tracking::{entries_to_recheck, reconcile};

const DEFAULT_BATCH_SIZE: usize = 5;
const PROGRESS_INTERVAL: usize = 50;

/// What one finished cycle produced. Delivery collaborators consume this;
/// the cycle itself never waits on more than one send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOutcome {
    pub newly_available: Vec<TrackedEntry>,
    pub pending_snapshot: Vec<TrackedEntry>,
    pub stats: CycleStats,
    pub dry_run: bool,
    /// Whether the notifier accepted the payload
    pub notified: bool,
}

impl CycleOutcome {
    pub fn payload(&self) -> NotificationPayload {
        NotificationPayload {
            newly_available: self.newly_available.clone(),
            pending_snapshot: self.pending_snapshot.clone(),
        }
    }
}

/// Runs scan cycles: fetch feeds, resolve every entry against the library,
/// fold results into tracked state, persist, then notify.
///
/// At most one cycle runs at a time. A cycle requested while another is
/// active is dropped, not queued.
pub struct CycleRunner {
    feeds: Vec<Arc<dyn FeedSource>>,
    library: Arc<dyn LibraryService>,
    secondary: Option<Arc<dyn SecondaryMetadataService>>,
    notifier: Option<Arc<dyn Notifier>>,
    store: Arc<dyn StateStore>,
    orchestrator: MatchOrchestrator,
    settings: MatchSettings,
    batch_size: usize,
    dry_run: bool,
    running: AtomicBool,
}

/// Clears the running flag however the cycle ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CycleRunner {
    pub fn new(
        feeds: Vec<Arc<dyn FeedSource>>,
        library: Arc<dyn LibraryService>,
        store: Arc<dyn StateStore>,
        settings: MatchSettings,
    ) -> Self {
        let orchestrator = MatchOrchestrator::standard(settings.exhaustive_scan, settings.type_fallback);
        Self {
            feeds,
            library,
            secondary: None,
            notifier: None,
            store,
            orchestrator,
            settings,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn SecondaryMetadataService>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Entries resolved concurrently per batch, clamped to 1..=10
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Resolve and reconcile, but skip persisting and notifying
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one cycle. Returns `Ok(None)` when another cycle was already
    /// running and this request was dropped.
    ///
    /// Errors only for failures that abort the whole cycle (tracked state
    /// could not be loaded or saved). In that case nothing is sent.
    #[instrument(skip(self), fields(dry_run = self.dry_run))]
    pub async fn run_cycle(&self) -> Result<Option<CycleOutcome>> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(operation = "scan_cycle", "Scan cycle already in progress, dropping this request");
            return Ok(None);
        }
        let _guard = RunningGuard(&self.running);

        info!(operation = "scan_cycle", "Starting scan cycle");

        let watchlist = fetch_watchlist(&self.feeds).await;
        let previous = self.store.load().context("Failed to load tracked state")?;
        if watchlist.is_empty() && !previous.is_empty() {
            warn!("Watchlist is empty; pending entries will be dropped from tracked state");
        }

        // Fresh per cycle: index and scan cache never carry over
        let ctx = CycleContext::new(self.library.clone(), self.secondary.clone(), self.settings.clone());
        if !watchlist.is_empty() || previous.iter().any(|t| t.is_added()) {
            ctx.index().await;
        }

        let recheck = entries_to_recheck(&previous, &watchlist);
        if !recheck.is_empty() {
            info!("Re-checking {} added entries no longer on the watchlist", recheck.len());
        }

        let mut tracker = ProgressTracker::new(watchlist.len() + recheck.len(), PROGRESS_INTERVAL);
        let watchlist_results = self.resolve_all(watchlist, &ctx, &mut tracker).await;
        let recheck_results = self.resolve_all(recheck, &ctx, &mut tracker).await;
        let mut stats = tracker.finish(ctx.scan_cache().remote_calls());

        let reconciliation = reconcile(previous, &watchlist_results, &recheck_results, Utc::now());
        stats.newly_available = reconciliation.newly_available.len();
        stats.regressed = reconciliation.regressed.len();
        stats.removed = reconciliation.removed;

        let mut outcome = CycleOutcome {
            pending_snapshot: reconciliation.pending_snapshot(),
            newly_available: reconciliation.newly_available,
            stats,
            dry_run: self.dry_run,
            notified: false,
        };

        if self.dry_run {
            info!(
                "Dry-run mode: not saving {} tracked entries or sending notifications",
                reconciliation.tracked.len()
            );
            log_summary(&outcome.stats);
            return Ok(Some(outcome));
        }

        if let Err(e) = self.store.save(&reconciliation.tracked) {
            error!(operation = "persist_state", "Scan cycle aborted, no notification sent: {:#}", e);
            return Err(e.context("Failed to persist tracked state"));
        }

        outcome.notified = self.deliver(&outcome).await;
        log_summary(&outcome.stats);
        Ok(Some(outcome))
    }

    /// Resolve entries in batches; entries within a batch run concurrently.
    /// Results keep the input order.
    async fn resolve_all(
        &self,
        entries: Vec<WatchlistEntry>,
        ctx: &CycleContext,
        tracker: &mut ProgressTracker,
    ) -> Vec<(WatchlistEntry, MatchResult)> {
        let mut results = Vec::with_capacity(entries.len());
        for batch in entries.chunks(self.batch_size) {
            let resolutions = join_all(batch.iter().map(|entry| self.orchestrator.resolve(entry, ctx))).await;
            for (entry, resolution) in batch.iter().zip(resolutions) {
                tracker.record(&resolution);
                results.push((entry.clone(), resolution.result));
            }
        }
        results
    }

    async fn deliver(&self, outcome: &CycleOutcome) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };
        match notifier.notify(&outcome.payload()).await {
            Ok(()) => true,
            Err(e) => {
                // State is already saved; the next cycle will not re-announce these
                error!(
                    operation = "notify",
                    channel = notifier.channel_name(),
                    "Failed to deliver notification for {} titles: {}",
                    outcome.newly_available.len(),
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests;
