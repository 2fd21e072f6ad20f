//! Resolution strategies tried in order by the orchestrator.
//!
//! Each tier answers one question: is this entry, as its declared media
//! type, in the library? `Ok(None)` means "not found here"; an `Err` means the
//! tier could not answer and the orchestrator moves on.

use async_trait::async_trait;
use plexwatch_models::{MatchResult, WatchlistEntry};
use plexwatch_sources::SourceError;

use crate::context::CycleContext;

mod index;
mod scan;
mod search;
mod secondary;

pub use index::IndexTier;
pub use scan::ScanTier;
pub use search::SearchTier;
pub use secondary::SecondaryTier;

/// Where an entry is in its resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchState {
    NotStarted,
    TierIndex,
    TierSecondary,
    TierSearch,
    TierScan,
    ResolvedAsRequestedType,
    ResolvedAsAlternateType,
    Unresolved,
}

#[async_trait]
pub trait MatchTier: Send + Sync {
    /// Short name used in logs and stats
    fn name(&self) -> &'static str;

    /// State the orchestrator is in while this tier runs
    fn state(&self) -> MatchState;

    async fn attempt(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Result<Option<MatchResult>, SourceError>;
}

/// The standard chain: index, secondary service, remote search, then the
/// exhaustive scan when enabled
pub fn standard_tiers(exhaustive_scan: bool) -> Vec<Box<dyn MatchTier>> {
    let mut tiers: Vec<Box<dyn MatchTier>> = vec![
        Box::new(IndexTier),
        Box::new(SecondaryTier),
        Box::new(SearchTier),
    ];
    if exhaustive_scan {
        tiers.push(Box::new(ScanTier));
    }
    tiers
}
