use std::sync::Arc;
use plexwatch_config::{Config, MatchingConfig};
use plexwatch_sources::{LibraryService, SecondaryMetadataService};
use tokio::sync::OnceCell;

use crate::identity_index::IdentityIndex;
use crate::scan_cache::ScanCache;

/// Knobs the tiers read during a cycle
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub excluded_sections: Vec<String>,
    pub page_size: usize,
    pub exhaustive_scan: bool,
    pub type_fallback: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        let matching = MatchingConfig::default();
        Self {
            excluded_sections: Vec::new(),
            page_size: 200,
            exhaustive_scan: matching.exhaustive_scan,
            type_fallback: matching.type_fallback,
        }
    }
}

impl MatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            excluded_sections: config.plex.excluded_sections.clone(),
            page_size: config.plex.page_size,
            exhaustive_scan: config.matching.exhaustive_scan,
            type_fallback: config.matching.type_fallback,
        }
    }
}

/// State shared by every resolution within one scan cycle.
///
/// Created at cycle start and dropped at cycle end, so the identity index
/// and the scan cache never outlive the cycle that built them.
pub struct CycleContext {
    library: Arc<dyn LibraryService>,
    secondary: Option<Arc<dyn SecondaryMetadataService>>,
    settings: MatchSettings,
    index: OnceCell<IdentityIndex>,
    scan_cache: ScanCache,
}

impl CycleContext {
    pub fn new(
        library: Arc<dyn LibraryService>,
        secondary: Option<Arc<dyn SecondaryMetadataService>>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            library,
            secondary,
            settings,
            index: OnceCell::new(),
            scan_cache: ScanCache::new(),
        }
    }

    /// The identity index, built on first use. Later and concurrent callers
    /// get the same instance without re-enumerating the library.
    pub async fn index(&self) -> &IdentityIndex {
        self.index
            .get_or_init(|| async {
                IdentityIndex::build(
                    self.library.as_ref(),
                    &self.settings.excluded_sections,
                    self.settings.page_size,
                )
                .await
            })
            .await
    }

    pub fn library(&self) -> &dyn LibraryService {
        self.library.as_ref()
    }

    pub fn secondary(&self) -> Option<&dyn SecondaryMetadataService> {
        self.secondary.as_deref()
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn scan_cache(&self) -> &ScanCache {
        &self.scan_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[tokio::test]
    async fn test_index_is_built_once() {
        let library = Arc::new(MockLibrary::new().with_item(movie("1", "Heat", 1995, "1")));
        let ctx = CycleContext::new(library.clone(), None, MatchSettings::default());

        let (a, b) = tokio::join!(ctx.index(), ctx.index());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        ctx.index().await;

        // One listing per section, not per caller
        assert_eq!(library.list_items_calls(), 2);
    }
}
