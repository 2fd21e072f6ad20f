use plexwatch_models::{MatchResult, WatchlistEntry};
use tracing::{debug, trace, warn};

use crate::context::CycleContext;
use crate::tiers::{standard_tiers, MatchState, MatchTier};

/// How one entry was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: MatchResult,
    pub state: MatchState,
    /// Name of the tier that found the entry
    pub tier: Option<&'static str>,
    /// Tiers that errored and were skipped
    pub tier_failures: usize,
}

/// Runs the tiers in order for the entry's declared type, then once more
/// for the opposite type. First hit wins.
pub struct MatchOrchestrator {
    tiers: Vec<Box<dyn MatchTier>>,
    type_fallback: bool,
}

impl MatchOrchestrator {
    pub fn new(tiers: Vec<Box<dyn MatchTier>>, type_fallback: bool) -> Self {
        Self { tiers, type_fallback }
    }

    pub fn standard(exhaustive_scan: bool, type_fallback: bool) -> Self {
        Self::new(standard_tiers(exhaustive_scan), type_fallback)
    }

    /// Resolve one entry. "Not found" is a normal outcome; tier errors are
    /// logged and the next tier runs.
    pub async fn resolve(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Resolution {
        let mut state = MatchState::NotStarted;
        let mut tier_failures = 0;

        let mut passes = vec![entry.media_type];
        if self.type_fallback {
            passes.push(entry.media_type.opposite());
        }

        for media_type in passes {
            let candidate = entry.with_media_type(media_type);
            if let Some((result, tier)) = self.run_pass(&candidate, ctx, &mut state, &mut tier_failures).await {
                let final_state = if media_type == entry.media_type {
                    MatchState::ResolvedAsRequestedType
                } else {
                    MatchState::ResolvedAsAlternateType
                };
                trace!("'{}': {:?} -> {:?}", entry.title, state, final_state);
                debug!(
                    "Resolved '{}' ({}) via {} tier as {}",
                    entry.title,
                    entry.media_type,
                    tier,
                    media_type
                );
                return Resolution {
                    result,
                    state: final_state,
                    tier: Some(tier),
                    tier_failures,
                };
            }
        }

        debug!("Unresolved: '{}' ({})", entry.title, entry.media_type);
        Resolution {
            result: MatchResult::not_found(),
            state: MatchState::Unresolved,
            tier: None,
            tier_failures,
        }
    }

    async fn run_pass(
        &self,
        entry: &WatchlistEntry,
        ctx: &CycleContext,
        state: &mut MatchState,
        tier_failures: &mut usize,
    ) -> Option<(MatchResult, &'static str)> {
        for tier in &self.tiers {
            trace!("'{}' as {}: {:?} -> {:?}", entry.title, entry.media_type, state, tier.state());
            *state = tier.state();

            match tier.attempt(entry, ctx).await {
                Ok(Some(result)) => return Some((result, tier.name())),
                Ok(None) => {}
                Err(e) => {
                    *tier_failures += 1;
                    warn!(
                        tier = tier.name(),
                        transient = e.is_transient(),
                        "Tier {} failed for '{}', trying next: {}",
                        tier.name(),
                        entry.title,
                        e
                    );
                }
            }
        }
        None
    }
}
