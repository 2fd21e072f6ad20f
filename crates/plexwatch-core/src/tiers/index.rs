use async_trait::async_trait;
use plexwatch_models::{MatchResult, WatchlistEntry};
use plexwatch_sources::SourceError;
use tracing::trace;

use super::{MatchState, MatchTier};
use crate::context::CycleContext;

/// Exact lookup in the identity index. No remote calls beyond the one-time
/// index build.
pub struct IndexTier;

#[async_trait]
impl MatchTier for IndexTier {
    fn name(&self) -> &'static str {
        "index"
    }

    fn state(&self) -> MatchState {
        MatchState::TierIndex
    }

    async fn attempt(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Result<Option<MatchResult>, SourceError> {
        let Some(raw_id) = entry.external_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            return Ok(None);
        };

        let index = ctx.index().await;
        let hit = index.lookup_as(entry.external_provider, raw_id, entry.media_type);
        trace!("Index tier: '{}' ({}) -> {:?}", entry.title, raw_id, hit.map(|i| &i.internal_key));
        Ok(hit.map(|item| MatchResult::found(item.canonical_title.clone(), item.media_type)))
    }
}
