use async_trait::async_trait;
use plexwatch_models::{MatchResult, WatchlistEntry};
use plexwatch_sources::SourceError;
use tracing::{debug, warn};

use super::{MatchState, MatchTier};
use crate::context::CycleContext;

/// Last resort: enumerate the sections of the requested type and compare
/// identifiers directly. Only runs for entries with an external id, narrowed
/// to year ±1 when the year is known. Enumerations go through the scan cache.
pub struct ScanTier;

#[async_trait]
impl MatchTier for ScanTier {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn state(&self) -> MatchState {
        MatchState::TierScan
    }

    async fn attempt(&self, entry: &WatchlistEntry, ctx: &CycleContext) -> Result<Option<MatchResult>, SourceError> {
        let Some(external) = entry.external() else {
            return Ok(None);
        };
        let year_range = entry.year.map(|y| (y.saturating_sub(1), y.saturating_add(1)));
        let index = ctx.index().await;

        let mut first_error = None;
        let mut scanned = 0;
        for section in index.sections_of(entry.media_type) {
            let items = match ctx
                .scan_cache()
                .get_or_scan(ctx.library(), &section.id, entry.media_type, year_range, ctx.settings().page_size)
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    warn!("Scan tier: section '{}' could not be enumerated: {}", section.title, e);
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            scanned += items.len();
            if let Some(item) = items.iter().find(|i| i.has_external_id(&external)) {
                debug!("Scan tier: found {} in section '{}'", external, section.title);
                return Ok(Some(MatchResult::found(item.canonical_title.clone(), item.media_type)));
            }
        }

        debug!("Scan tier: {} not among {} scanned items", external, scanned);
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
