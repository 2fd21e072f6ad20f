use async_trait::async_trait;
use plexwatch_models::{MatchResult, WatchlistEntry};
use plexwatch_sources::SourceError;
use tracing::trace;

use super::{MatchState, MatchTier};
use crate::context::CycleContext;
use crate::normalize::{titles_equivalent, years_compatible};

/// Title search through the library's own query interface, scoped to the
/// entry's declared type. First candidate passing both title and year
/// checks wins.
pub struct SearchTier;

#[async_trait]
impl MatchTier for SearchTier {
    fn name(&self) -> &'static str {
        "search"
    }

    fn state(&self) -> MatchState {
        MatchState::TierSearch
    }

    async fn attempt(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Result<Option<MatchResult>, SourceError> {
        if entry.title.trim().is_empty() {
            return Ok(None);
        }
        let candidates = ctx.library().search(&entry.title, entry.media_type).await?;
        trace!("Search tier: {} candidates for '{}'", candidates.len(), entry.title);

        Ok(candidates
            .into_iter()
            .filter(|c| c.media_type == entry.media_type)
            .find(|c| titles_equivalent(&c.canonical_title, &entry.title) && years_compatible(c.year, entry.year))
            .map(|c| MatchResult::found(c.canonical_title, c.media_type)))
    }
}
