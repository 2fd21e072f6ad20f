use async_trait::async_trait;
use plexwatch_models::{ExternalId, LibraryItem, MatchResult, MediaType, WatchlistEntry};
use plexwatch_sources::SourceError;
use tracing::debug;

use super::{MatchState, MatchTier};
use crate::context::CycleContext;
use crate::identity_index::IdentityIndex;

/// Discovery through the optional secondary metadata service.
///
/// The service is trusted only to point at candidates. A candidate is
/// accepted when its internal key is an indexed item of the requested type
/// that carries the entry's external id.
pub struct SecondaryTier;

fn verify<'a>(
    candidates: &[LibraryItem],
    index: &'a IdentityIndex,
    external: &ExternalId,
    media_type: MediaType,
) -> Option<&'a LibraryItem> {
    candidates.iter().find_map(|candidate| {
        index
            .get_by_key(&candidate.internal_key)
            .filter(|indexed| indexed.media_type == media_type && indexed.has_external_id(external))
    })
}

#[async_trait]
impl MatchTier for SecondaryTier {
    fn name(&self) -> &'static str {
        "secondary"
    }

    fn state(&self) -> MatchState {
        MatchState::TierSecondary
    }

    async fn attempt(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Result<Option<MatchResult>, SourceError> {
        let Some(service) = ctx.secondary() else {
            return Ok(None);
        };
        // Without an id there is nothing to verify a candidate against
        let Some(external) = entry.external() else {
            return Ok(None);
        };
        let index = ctx.index().await;

        for query in [external.id.as_str(), entry.title.as_str()] {
            let candidates = service.search_by_id_or_title(None, query).await?;
            if let Some(item) = verify(&candidates, index, &external, entry.media_type) {
                return Ok(Some(MatchResult::found(item.canonical_title.clone(), item.media_type)));
            }
            if !candidates.is_empty() {
                debug!(
                    "{}: {} candidates for '{}' but none verified against {}",
                    service.service_name(),
                    candidates.len(),
                    query,
                    external
                );
            }
        }
        Ok(None)
    }
}
