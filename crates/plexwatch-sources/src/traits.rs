use async_trait::async_trait;
use plexwatch_models::{ItemPage, LibraryItem, MediaType, NotificationPayload, Section, WatchlistEntry};
use crate::error::SourceError;

/// Filters for one page of a section listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub media_type: MediaType,
    /// Inclusive year bounds; `None` lists every year
    pub year_range: Option<(u32, u32)>,
    pub page_start: usize,
    pub page_size: usize,
}

impl ItemFilter {
    pub fn new(media_type: MediaType, page_size: usize) -> Self {
        Self {
            media_type,
            year_range: None,
            page_start: 0,
            page_size,
        }
    }

    pub fn with_year_range(mut self, from: u32, to: u32) -> Self {
        self.year_range = Some((from.min(to), from.max(to)));
        self
    }

    pub fn at(mut self, page_start: usize) -> Self {
        self.page_start = page_start;
        self
    }
}

/// A watchlist feed. Fails soft: transport or parse problems yield an
/// empty list and a warning.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch(&self) -> Vec<WatchlistEntry>;
}

/// Read-only view of the media server library
#[async_trait]
pub trait LibraryService: Send + Sync {
    /// Movie and series sections, minus the titles in `exclude`
    async fn list_sections(&self, exclude: &[String]) -> Result<Vec<Section>, SourceError>;

    async fn list_items(&self, section_id: &str, filter: &ItemFilter) -> Result<ItemPage, SourceError>;

    async fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError>;
}

/// Optional external metadata service used to discover candidates.
///
/// Results are only leads: callers verify identity elsewhere.
#[async_trait]
pub trait SecondaryMetadataService: Send + Sync {
    fn service_name(&self) -> &str;

    /// `section_scope` restricts results to one section when given
    async fn search_by_id_or_title(
        &self,
        section_scope: Option<&str>,
        query: &str,
    ) -> Result<Vec<LibraryItem>, SourceError>;
}

/// Delivers the per-cycle notification payload
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel_name(&self) -> &str;

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), SourceError>;
}
