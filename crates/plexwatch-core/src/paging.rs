use plexwatch_models::LibraryItem;
use plexwatch_sources::{ItemFilter, LibraryService, SourceError};

/// Everything one paginated section listing produced
pub(crate) struct PagedItems {
    pub items: Vec<LibraryItem>,
    /// Remote requests issued, failed ones included
    pub requests: usize,
    /// Set when a page request failed; `items` then holds the pages read before it
    pub error: Option<SourceError>,
}

/// Walk every page of one section listing.
///
/// Stops on an empty or short page, or once the reported total is reached.
pub(crate) async fn fetch_all_pages(
    library: &dyn LibraryService,
    section_id: &str,
    filter: &ItemFilter,
) -> PagedItems {
    let page_size = filter.page_size.max(1);
    let mut items = Vec::new();
    let mut requests = 0;
    let mut start = 0;

    loop {
        let page_filter = filter.clone().at(start);
        requests += 1;
        let page = match library.list_items(section_id, &page_filter).await {
            Ok(page) => page,
            Err(e) => {
                return PagedItems {
                    items,
                    requests,
                    error: Some(e),
                }
            }
        };

        let returned = page.items.len();
        items.extend(page.items);
        start += returned;

        let reached_total = page.total_size.map(|total| start >= total).unwrap_or(false);
        if returned == 0 || returned < page_size || reached_total {
            break;
        }
    }

    PagedItems {
        items,
        requests,
        error: None,
    }
}
