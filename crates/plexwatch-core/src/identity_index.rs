use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use plexwatch_models::{LibraryItem, MediaType, Provider, Section};
use plexwatch_sources::{ItemFilter, LibraryService};
use tracing::{debug, info, warn};

use crate::paging::fetch_all_pages;

/// In-memory map from external identifiers to library items.
///
/// Built once per cycle from a full enumeration of the library. Every
/// provider table points at the same `Arc<LibraryItem>`, so an item with
/// several ids is stored once. TMDb ids are not unique across movies and
/// shows, hence each id maps to a list.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_imdb: HashMap<String, Vec<Arc<LibraryItem>>>,
    by_tmdb: HashMap<String, Vec<Arc<LibraryItem>>>,
    by_tvdb: HashMap<String, Vec<Arc<LibraryItem>>>,

    /// Every indexed item by server key, ids or not
    by_key: HashMap<String, Arc<LibraryItem>>,

    sections: Vec<Section>,
    skipped_sections: Vec<String>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, provider: Provider) -> &HashMap<String, Vec<Arc<LibraryItem>>> {
        match provider {
            Provider::Imdb => &self.by_imdb,
            Provider::Tmdb => &self.by_tmdb,
            Provider::Tvdb => &self.by_tvdb,
        }
    }

    fn table_mut(&mut self, provider: Provider) -> &mut HashMap<String, Vec<Arc<LibraryItem>>> {
        match provider {
            Provider::Imdb => &mut self.by_imdb,
            Provider::Tmdb => &mut self.by_tmdb,
            Provider::Tvdb => &mut self.by_tvdb,
        }
    }

    /// Add an item under its key and each of its external ids.
    /// An item whose key is already indexed is ignored.
    pub fn insert(&mut self, item: LibraryItem) {
        if self.by_key.contains_key(&item.internal_key) {
            return;
        }
        let item = Arc::new(item);
        for external in &item.external_ids {
            self.table_mut(external.provider)
                .entry(external.id.clone())
                .or_default()
                .push(item.clone());
        }
        self.by_key.insert(item.internal_key.clone(), item);
    }

    /// Enumerate every movie and series section not in `exclude`.
    ///
    /// A section whose listing fails is skipped with a warning; whatever was
    /// read before the failure stays indexed.
    pub async fn build(library: &dyn LibraryService, exclude: &[String], page_size: usize) -> Self {
        let start = Instant::now();
        let mut index = Self::new();

        let sections = match library.list_sections(exclude).await {
            Ok(sections) => sections,
            Err(e) => {
                warn!(operation = "index_build", "Could not list library sections, index is empty: {}", e);
                return index;
            }
        };

        let mut requests = 0;
        for section in &sections {
            let Some(media_type) = section.media_type() else {
                continue;
            };
            let filter = ItemFilter::new(media_type, page_size);
            let paged = fetch_all_pages(library, &section.id, &filter).await;
            requests += paged.requests;

            let read = paged.items.len();
            for item in paged.items {
                index.insert(item);
            }

            match paged.error {
                Some(e) => {
                    warn!(
                        operation = "index_build",
                        section = %section.title,
                        "Skipping rest of section '{}' after {} items: {}",
                        section.title,
                        read,
                        e
                    );
                    index.skipped_sections.push(section.id.clone());
                }
                None => debug!("Indexed section '{}': {} items", section.title, read),
            }
        }
        index.sections = sections;

        info!(
            operation = "index_build",
            items = index.len(),
            imdb = index.by_imdb.len(),
            tmdb = index.by_tmdb.len(),
            tvdb = index.by_tvdb.len(),
            sections = index.sections.len(),
            skipped_sections = index.skipped_sections.len(),
            requests = requests,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Identity index built"
        );
        index
    }

    /// Find an item by external id.
    ///
    /// When the provider is missing, or the tagged table has no hit, the id's
    /// shape decides which other table to try: feeds sometimes publish a raw
    /// IMDb id under the wrong provider or none at all.
    pub fn lookup(&self, provider: Option<Provider>, id: &str) -> Option<&LibraryItem> {
        self.lookup_all(provider, id).first().map(|item| item.as_ref())
    }

    /// Like [`lookup`](Self::lookup), restricted to one media type
    pub fn lookup_as(&self, provider: Option<Provider>, id: &str, media_type: MediaType) -> Option<&LibraryItem> {
        self.lookup_all(provider, id)
            .iter()
            .find(|item| item.media_type == media_type)
            .map(|item| item.as_ref())
    }

    fn lookup_all(&self, provider: Option<Provider>, id: &str) -> &[Arc<LibraryItem>] {
        let id = id.trim();
        if let Some(provider) = provider {
            if let Some(items) = self.table(provider).get(id) {
                return items;
            }
        }
        match Provider::infer_from_id(id) {
            Some(inferred) if Some(inferred) != provider => {
                self.table(inferred).get(id).map(|v| v.as_slice()).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    pub fn get_by_key(&self, internal_key: &str) -> Option<&LibraryItem> {
        self.by_key.get(internal_key).map(|item| item.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Distinct ids indexed for a provider
    pub fn id_count(&self, provider: Provider) -> usize {
        self.table(provider).len()
    }

    /// Sections enumerated by [`build`](Self::build)
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_of(&self, media_type: MediaType) -> impl Iterator<Item = &Section> {
        self.sections
            .iter()
            .filter(move |s| s.media_type() == Some(media_type))
    }

    pub fn skipped_sections(&self) -> &[String] {
        &self.skipped_sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn library() -> MockLibrary {
        let mut library = MockLibrary::new();
        // Enough movies to need several pages
        for n in 0..7u32 {
            library = library.with_item(
                movie(&format!("m{}", n), &format!("Film {}", n), 2000 + n, "1")
                    .with_external_id(imdb(&format!("tt{:07}", 100 + n))),
            );
        }
        library
            .with_item(
                movie("1234", "Inception", 2010, "1")
                    .with_external_id(imdb("tt1375666"))
                    .with_external_id(tmdb("27205")),
            )
            .with_item(series("5678", "The Office", 2005, "2").with_external_id(tvdb("73244")))
            .with_item(movie("9999", "Untagged Home Movie", 2019, "1"))
    }

    #[tokio::test]
    async fn test_build_indexes_every_provider() {
        let library = library();
        let index = IdentityIndex::build(&library, &[], 3).await;

        assert_eq!(index.len(), 10);
        assert_eq!(index.lookup(Some(Provider::Imdb), "tt1375666").unwrap().internal_key, "1234");
        assert_eq!(index.lookup(Some(Provider::Tmdb), "27205").unwrap().internal_key, "1234");
        assert_eq!(index.lookup(Some(Provider::Tvdb), "73244").unwrap().internal_key, "5678");
        for n in 0..7u32 {
            let id = format!("tt{:07}", 100 + n);
            assert_eq!(index.lookup(Some(Provider::Imdb), &id).unwrap().internal_key, format!("m{}", n));
        }
        assert!(index.get_by_key("9999").is_some());
        assert_eq!(index.id_count(Provider::Imdb), 8);
    }

    #[tokio::test]
    async fn test_lookup_falls_back_on_id_shape() {
        let library = library();
        let index = IdentityIndex::build(&library, &[], 200).await;

        assert_eq!(index.lookup(None, "tt1375666").unwrap().canonical_title, "Inception");
        // Mis-tagged provider still finds the IMDb id
        assert_eq!(index.lookup(Some(Provider::Tmdb), "tt1375666").unwrap().canonical_title, "Inception");
        // Numeric ids are ambiguous without a provider
        assert!(index.lookup(None, "27205").is_none());
    }

    #[tokio::test]
    async fn test_failed_section_is_skipped() {
        let library = library().failing_section("2");
        let index = IdentityIndex::build(&library, &[], 200).await;

        assert!(index.lookup(Some(Provider::Imdb), "tt1375666").is_some());
        assert!(index.lookup(Some(Provider::Tvdb), "73244").is_none());
        assert_eq!(index.skipped_sections(), &["2".to_string()]);
    }

    #[tokio::test]
    async fn test_excluded_sections_are_not_enumerated() {
        let library = library();
        let index = IdentityIndex::build(&library, &["TV Shows".to_string()], 200).await;

        assert!(index.lookup(Some(Provider::Tvdb), "73244").is_none());
        assert_eq!(index.sections().len(), 1);
    }

    #[test]
    fn test_tmdb_ids_shared_across_types() {
        let mut index = IdentityIndex::new();
        index.insert(movie("1", "Shogun", 1980, "1").with_external_id(tmdb("1920")));
        index.insert(series("2", "Twin Peaks", 1990, "2").with_external_id(tmdb("1920")));

        let found = index.lookup_as(Some(Provider::Tmdb), "1920", MediaType::Series).unwrap();
        assert_eq!(found.canonical_title, "Twin Peaks");
        assert!(index.lookup_as(Some(Provider::Imdb), "1920", MediaType::Series).is_none());
    }
}
