//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use plexwatch_models::{
    ExternalId, ItemPage, LibraryItem, MediaType, NotificationPayload, Provider, Section, TrackedEntry, WatchlistEntry,
};
use plexwatch_sources::{FeedSource, ItemFilter, LibraryService, Notifier, SecondaryMetadataService, SourceError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::normalize::normalize_title;
use crate::state_store::StateStore;

pub fn movie(key: &str, title: &str, year: u32, section: &str) -> LibraryItem {
    LibraryItem::new(key, title, Some(year), MediaType::Movie, section)
}

pub fn series(key: &str, title: &str, year: u32, section: &str) -> LibraryItem {
    LibraryItem::new(key, title, Some(year), MediaType::Series, section)
}

pub fn imdb(id: &str) -> ExternalId {
    ExternalId::new(Provider::Imdb, id).expect("valid imdb id")
}

pub fn tmdb(id: &str) -> ExternalId {
    ExternalId::new(Provider::Tmdb, id).expect("valid tmdb id")
}

pub fn tvdb(id: &str) -> ExternalId {
    ExternalId::new(Provider::Tvdb, id).expect("valid tvdb id")
}

/// Library with two sections: "1" movies and "2" shows
#[derive(Default)]
pub struct MockLibrary {
    sections: Vec<Section>,
    items: Vec<LibraryItem>,
    failing_sections: HashSet<String>,
    failing_once: Mutex<HashSet<String>>,
    fail_search: bool,
    pub list_items_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self {
            sections: vec![
                Section { id: "1".into(), section_type: "movie".into(), title: "Movies".into() },
                Section { id: "2".into(), section_type: "show".into(), title: "TV Shows".into() },
            ],
            ..Default::default()
        }
    }

    pub fn with_section(mut self, id: &str, section_type: &str, title: &str) -> Self {
        self.sections.push(Section {
            id: id.into(),
            section_type: section_type.into(),
            title: title.into(),
        });
        self
    }

    pub fn with_item(mut self, item: LibraryItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn failing_section(mut self, id: &str) -> Self {
        self.failing_sections.insert(id.to_string());
        self
    }

    /// The first listing request for `id` fails, later ones succeed
    pub fn failing_once(self, id: &str) -> Self {
        self.failing_once.lock().expect("failing_once lock").insert(id.to_string());
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn list_items_calls(&self) -> usize {
        self.list_items_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryService for MockLibrary {
    async fn list_sections(&self, exclude: &[String]) -> Result<Vec<Section>, SourceError> {
        Ok(self
            .sections
            .iter()
            .filter(|s| s.media_type().is_some())
            .filter(|s| !exclude.iter().any(|e| e.eq_ignore_ascii_case(&s.title)))
            .cloned()
            .collect())
    }

    async fn list_items(&self, section_id: &str, filter: &ItemFilter) -> Result<ItemPage, SourceError> {
        self.list_items_calls.fetch_add(1, Ordering::SeqCst);
        let failed_once = self.failing_once.lock().expect("failing_once lock").remove(section_id);
        if failed_once || self.failing_sections.contains(section_id) {
            return Err(SourceError::Status {
                status: 500,
                url: format!("mock://sections/{}", section_id),
            });
        }
        let matching: Vec<LibraryItem> = self
            .items
            .iter()
            .filter(|i| i.section_id == section_id && i.media_type == filter.media_type)
            .filter(|i| match (filter.year_range, i.year) {
                (Some((from, to)), Some(year)) => year >= from && year <= to,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(filter.page_start)
            .take(filter.page_size)
            .collect();
        Ok(ItemPage {
            items,
            total_size: Some(total),
        })
    }

    async fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(SourceError::Timeout("mock://search".into()));
        }
        let needle = normalize_title(query);
        Ok(self
            .items
            .iter()
            .filter(|i| i.media_type == media_type)
            .filter(|i| {
                let title = normalize_title(&i.canonical_title);
                title.contains(&needle) || needle.contains(&title)
            })
            .cloned()
            .collect())
    }
}

/// Secondary service returning a fixed candidate list for every query
#[derive(Default)]
pub struct MockSecondary {
    candidates: Vec<LibraryItem>,
    fail: bool,
    pub queries: Mutex<Vec<String>>,
}

impl MockSecondary {
    pub fn returning(candidates: Vec<LibraryItem>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl SecondaryMetadataService for MockSecondary {
    fn service_name(&self) -> &str {
        "mock-secondary"
    }

    async fn search_by_id_or_title(
        &self,
        _section_scope: Option<&str>,
        query: &str,
    ) -> Result<Vec<LibraryItem>, SourceError> {
        self.queries.lock().expect("queries lock").push(query.to_string());
        if self.fail {
            return Err(SourceError::Network("connection refused".into()));
        }
        Ok(self.candidates.clone())
    }
}

/// Records every payload it is handed
#[derive(Default)]
pub struct MockNotifier {
    pub payloads: Mutex<Vec<NotificationPayload>>,
}

impl MockNotifier {
    pub fn payloads(&self) -> Vec<NotificationPayload> {
        self.payloads.lock().expect("payloads lock").clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn channel_name(&self) -> &str {
        "mock"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), SourceError> {
        self.payloads.lock().expect("payloads lock").push(payload.clone());
        Ok(())
    }
}

/// Feed returning the same entries every fetch. With a gate, each fetch
/// waits for the gate to be opened first.
#[derive(Default)]
pub struct StaticFeed {
    entries: Vec<WatchlistEntry>,
    gate: Option<Arc<Notify>>,
}

impl StaticFeed {
    pub fn new(entries: Vec<WatchlistEntry>) -> Self {
        Self { entries, gate: None }
    }

    pub fn gated(entries: Vec<WatchlistEntry>, gate: Arc<Notify>) -> Self {
        Self {
            entries,
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    fn source_name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Vec<WatchlistEntry> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.entries.clone()
    }
}

/// State store kept in memory, optionally refusing every save
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<TrackedEntry>>,
    fail_save: bool,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn failing_save() -> Self {
        Self {
            fail_save: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> Vec<TrackedEntry> {
        self.entries.lock().expect("entries lock").clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> anyhow::Result<Vec<TrackedEntry>> {
        Ok(self.entries())
    }

    fn save(&self, entries: &[TrackedEntry]) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            anyhow::bail!("disk full");
        }
        *self.entries.lock().expect("entries lock") = entries.to_vec();
        Ok(())
    }
}
