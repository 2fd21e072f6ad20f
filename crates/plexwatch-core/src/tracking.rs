use std::collections::HashSet;
use chrono::{DateTime, Utc};
use plexwatch_models::{ExternalId, MatchResult, MediaType, TrackedEntry, WatchlistEntry};
use tracing::{debug, info};

/// Tracked state after folding one cycle's match results into it
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Full state to persist
    pub tracked: Vec<TrackedEntry>,
    /// Entries that became available this cycle
    pub newly_available: Vec<TrackedEntry>,
    /// Entries that were available and no longer are
    pub regressed: Vec<TrackedEntry>,
    /// Pending entries dropped because they left the watchlist
    pub removed: usize,
}

impl Reconciliation {
    pub fn pending_snapshot(&self) -> Vec<TrackedEntry> {
        self.tracked.iter().filter(|t| !t.is_added()).cloned().collect()
    }
}

/// Added entries that no longer appear on the watchlist. They are kept as
/// history but still re-checked so removals from the library are noticed.
pub fn entries_to_recheck(previous: &[TrackedEntry], watchlist: &[WatchlistEntry]) -> Vec<WatchlistEntry> {
    previous
        .iter()
        .filter(|t| t.is_added())
        .filter(|t| !watchlist.iter().any(|entry| t.is_same_item(entry)))
        .map(|t| t.to_watchlist_entry())
        .collect()
}

/// Fold match results into the previous tracked state.
///
/// - unseen watchlist entries are created as pending
/// - found entries move to added, stamped with `now`
/// - entries not found move back to pending
/// - an entry leaves the state only when it is off the watchlist and was not
///   added at the start of this cycle
///
/// `rechecked` holds results for [`entries_to_recheck`]; they update status
/// but never create entries.
pub fn reconcile(
    previous: Vec<TrackedEntry>,
    watchlist: &[(WatchlistEntry, MatchResult)],
    rechecked: &[(WatchlistEntry, MatchResult)],
    now: DateTime<Utc>,
) -> Reconciliation {
    let prior_added: Vec<bool> = previous.iter().map(|t| t.is_added()).collect();
    let mut tracked = previous;
    let mut on_watchlist = vec![false; tracked.len()];
    let mut newly_available = Vec::new();
    let mut regressed = Vec::new();

    for (entry, result) in watchlist {
        let idx = match tracked.iter().position(|t| t.is_same_item(entry)) {
            Some(idx) => {
                tracked[idx].refresh_from(entry);
                idx
            }
            None => {
                debug!("Tracking new watchlist entry '{}'", entry.title);
                tracked.push(TrackedEntry::from_entry(entry));
                on_watchlist.push(false);
                tracked.len() - 1
            }
        };
        on_watchlist[idx] = true;
        apply(&mut tracked, idx, result, now, &mut newly_available, &mut regressed);
    }

    for (entry, result) in rechecked {
        if let Some(idx) = tracked.iter().position(|t| t.is_same_item(entry)) {
            apply(&mut tracked, idx, result, now, &mut newly_available, &mut regressed);
        }
    }

    let before = tracked.len();
    let mut keep = on_watchlist
        .iter()
        .enumerate()
        .map(|(idx, seen)| *seen || prior_added.get(idx).copied().unwrap_or(false));
    tracked.retain(|_| keep.next().unwrap_or(false));
    let removed = before - tracked.len();

    let tracked = dedupe_by_external(tracked);

    let newly_available: Vec<TrackedEntry> = newly_available
        .into_iter()
        .filter_map(|identity| snapshot_of(&tracked, identity))
        .collect();
    let regressed: Vec<TrackedEntry> = regressed
        .into_iter()
        .filter_map(|identity| snapshot_of(&tracked, identity))
        .collect();

    info!(
        operation = "reconcile",
        tracked = tracked.len(),
        newly_available = newly_available.len(),
        regressed = regressed.len(),
        removed = removed,
        "Tracked state reconciled"
    );

    Reconciliation {
        tracked,
        newly_available,
        regressed,
        removed,
    }
}

/// Apply one match result to entry `idx`. Changes are recorded by identity
/// and resolved to final entries once retention and dedupe have run.
fn apply(
    tracked: &mut [TrackedEntry],
    idx: usize,
    result: &MatchResult,
    now: DateTime<Utc>,
    newly_available: &mut Vec<TrackedIdentity>,
    regressed: &mut Vec<TrackedIdentity>,
) {
    let entry = &mut tracked[idx];
    if result.is_found() {
        if entry.mark_added(now) {
            newly_available.push(TrackedIdentity::of(entry));
        }
    } else if entry.mark_pending() {
        info!("'{}' is no longer available in the library", entry.title);
        regressed.push(TrackedIdentity::of(entry));
    }
}

/// Stable handle on a tracked entry across retain/dedupe
#[derive(Debug, Clone, PartialEq, Eq)]
enum TrackedIdentity {
    External(ExternalId),
    Title(String, MediaType),
}

impl TrackedIdentity {
    fn of(entry: &TrackedEntry) -> Self {
        match entry.external() {
            Some(external) => TrackedIdentity::External(external),
            None => TrackedIdentity::Title(entry.title.trim().to_lowercase(), entry.media_type),
        }
    }
}

fn snapshot_of(tracked: &[TrackedEntry], identity: TrackedIdentity) -> Option<TrackedEntry> {
    tracked.iter().find(|t| TrackedIdentity::of(t) == identity).cloned()
}

/// At most one entry per (provider, id); the first one wins
fn dedupe_by_external(tracked: Vec<TrackedEntry>) -> Vec<TrackedEntry> {
    let mut seen: HashSet<ExternalId> = HashSet::new();
    tracked
        .into_iter()
        .filter(|t| match t.external() {
            Some(external) => seen.insert(external),
            None => true,
        })
        .collect()
}
