use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use plexwatch_models::{LibraryItem, MediaType};
use plexwatch_sources::{ItemFilter, LibraryService, SourceError};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::paging::fetch_all_pages;

/// (section id, media type, inclusive year range)
type ScanKey = (String, MediaType, Option<(u32, u32)>);

/// Per-cycle memo of section enumerations made by the exhaustive scan.
///
/// Each key is fetched at most once per cycle even under concurrent
/// resolution: callers racing on the same key wait on one shared cell. A
/// failed enumeration is not cached, so a later caller may try again.
#[derive(Default)]
pub struct ScanCache {
    entries: Mutex<HashMap<ScanKey, Arc<OnceCell<Arc<Vec<LibraryItem>>>>>>,
    remote_calls: AtomicUsize,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: ScanKey) -> Arc<OnceCell<Arc<Vec<LibraryItem>>>> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.entry(key).or_default().clone()
    }

    /// Items of one section, optionally narrowed to a year range
    pub async fn get_or_scan(
        &self,
        library: &dyn LibraryService,
        section_id: &str,
        media_type: MediaType,
        year_range: Option<(u32, u32)>,
        page_size: usize,
    ) -> Result<Arc<Vec<LibraryItem>>, SourceError> {
        let cell = self.cell((section_id.to_string(), media_type, year_range));
        let items = cell
            .get_or_try_init(|| async {
                let mut filter = ItemFilter::new(media_type, page_size);
                if let Some((from, to)) = year_range {
                    filter = filter.with_year_range(from, to);
                }
                let paged = fetch_all_pages(library, section_id, &filter).await;
                self.remote_calls.fetch_add(paged.requests, Ordering::SeqCst);
                if let Some(e) = paged.error {
                    return Err(e);
                }
                debug!(
                    section_id = section_id,
                    media_type = %media_type,
                    years = ?year_range,
                    items = paged.items.len(),
                    "Scan cache filled"
                );
                Ok(Arc::new(paged.items))
            })
            .await?;
        Ok(items.clone())
    }

    /// Remote requests issued to fill the cache this cycle
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }
}
