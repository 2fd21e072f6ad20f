use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use serde::Serialize;
use tracing::{info, warn};

use crate::orchestrator::Resolution;
use crate::tiers::MatchState;

/// Counters for one scan cycle
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CycleStats {
    pub entries: usize,
    /// Entries resolved, by the tier that found them
    pub resolved_by_tier: BTreeMap<String, usize>,
    pub resolved_as_alternate_type: usize,
    pub unresolved: usize,
    pub tier_failures: usize,
    pub scan_remote_calls: usize,
    pub newly_available: usize,
    pub regressed: usize,
    pub removed: usize,
    pub duration_ms: u64,
}

impl CycleStats {
    pub fn resolved(&self) -> usize {
        self.resolved_by_tier.values().sum()
    }
}

/// Tracks resolution progress through a cycle, logging periodically and a
/// summary at the end
pub struct ProgressTracker {
    total: usize,
    processed: usize,
    stats: CycleStats,
    start_time: Instant,
    progress_interval: usize,
    last_progress_log: usize,
}

impl ProgressTracker {
    /// `progress_interval`: log every N resolved entries
    pub fn new(total: usize, progress_interval: usize) -> Self {
        if total > 10 {
            info!("Resolving {} watchlist entries", total);
        }
        Self {
            total,
            processed: 0,
            stats: CycleStats {
                entries: total,
                ..Default::default()
            },
            start_time: Instant::now(),
            progress_interval: progress_interval.max(1),
            last_progress_log: 0,
        }
    }

    pub fn record(&mut self, resolution: &Resolution) {
        self.processed += 1;
        self.stats.tier_failures += resolution.tier_failures;
        match resolution.tier {
            Some(tier) if resolution.result.is_found() => {
                *self.stats.resolved_by_tier.entry(tier.to_string()).or_insert(0) += 1;
            }
            _ => self.stats.unresolved += 1,
        }
        if resolution.state == MatchState::ResolvedAsAlternateType {
            self.stats.resolved_as_alternate_type += 1;
        }
        self.log_progress();
    }

    fn log_progress(&mut self) {
        let current = self.processed;
        if current - self.last_progress_log < self.progress_interval && current != self.total {
            return;
        }
        let elapsed = self.start_time.elapsed();
        // Fast cycles finish before a progress line would help anyone
        if elapsed < Duration::from_millis(500) && current < self.total {
            return;
        }
        info!(
            "Progress: {}/{} | Resolved: {} | Unresolved: {} | Tier failures: {}",
            current,
            self.total,
            self.stats.resolved(),
            self.stats.unresolved,
            self.stats.tier_failures
        );
        self.last_progress_log = current;
    }

    pub fn finish(mut self, scan_remote_calls: usize) -> CycleStats {
        self.stats.scan_remote_calls = scan_remote_calls;
        self.stats.duration_ms = self.start_time.elapsed().as_millis() as u64;
        self.stats
    }
}

/// Summary line for a finished cycle; WARN when tiers failed along the way
pub fn log_summary(stats: &CycleStats) {
    let by_tier: Vec<String> = stats
        .resolved_by_tier
        .iter()
        .map(|(tier, count)| format!("{}: {}", tier, count))
        .collect();
    let by_tier = if by_tier.is_empty() { "none".to_string() } else { by_tier.join(", ") };

    if stats.tier_failures > 0 {
        warn!(
            "Scan cycle completed: {} entries in {:.1}s | Resolved: {} ({}) | Unresolved: {} | New: {} | Tier failures: {}",
            stats.entries,
            stats.duration_ms as f64 / 1000.0,
            stats.resolved(),
            by_tier,
            stats.unresolved,
            stats.newly_available,
            stats.tier_failures
        );
    } else {
        info!(
            "Scan cycle completed: {} entries in {:.1}s | Resolved: {} ({}) | Unresolved: {} | New: {}",
            stats.entries,
            stats.duration_ms as f64 / 1000.0,
            stats.resolved(),
            by_tier,
            stats.unresolved,
            stats.newly_available
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexwatch_models::{MatchResult, MediaType};

    #[test]
    fn test_record_counts_by_tier() {
        let mut tracker = ProgressTracker::new(3, 50);
        tracker.record(&Resolution {
            result: MatchResult::found("Inception", MediaType::Movie),
            state: MatchState::ResolvedAsRequestedType,
            tier: Some("index"),
            tier_failures: 0,
        });
        tracker.record(&Resolution {
            result: MatchResult::found("Chernobyl", MediaType::Series),
            state: MatchState::ResolvedAsAlternateType,
            tier: Some("index"),
            tier_failures: 1,
        });
        tracker.record(&Resolution {
            result: MatchResult::not_found(),
            state: MatchState::Unresolved,
            tier: None,
            tier_failures: 2,
        });

        let stats = tracker.finish(4);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.resolved(), 2);
        assert_eq!(stats.resolved_by_tier.get("index"), Some(&2));
        assert_eq!(stats.resolved_as_alternate_type, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.tier_failures, 3);
        assert_eq!(stats.scan_remote_calls, 4);
    }
}
