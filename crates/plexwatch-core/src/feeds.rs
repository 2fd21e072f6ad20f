use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use futures::future::join_all;
use plexwatch_models::{ExternalId, MediaType, WatchlistEntry};
use plexwatch_sources::FeedSource;
use tracing::{debug, info};

use crate::normalize::normalize_title;

/// Fetch every feed concurrently and merge them into one watchlist.
///
/// Feeds fail soft, so a dead feed just contributes nothing. Duplicates are
/// dropped by external id; normalized title and type only decide when one
/// side has no id. The first feed listed wins.
pub async fn fetch_watchlist(feeds: &[Arc<dyn FeedSource>]) -> Vec<WatchlistEntry> {
    let fetched = join_all(feeds.iter().map(|feed| async move {
        let entries = feed.fetch().await;
        debug!("Feed '{}' returned {} entries", feed.source_name(), entries.len());
        entries
    }))
    .await;

    let total: usize = fetched.iter().map(Vec::len).sum();
    let merged = merge_entries(fetched.into_iter().flatten());

    info!(
        operation = "fetch_watchlist",
        feeds = feeds.len(),
        fetched = total,
        unique = merged.len(),
        "Watchlist fetched"
    );
    merged
}

pub fn merge_entries(entries: impl IntoIterator<Item = WatchlistEntry>) -> Vec<WatchlistEntry> {
    let mut by_external: HashSet<ExternalId> = HashSet::new();
    // Value records whether the first entry with that title carried an id
    let mut by_title: HashMap<(String, MediaType), bool> = HashMap::new();
    let mut merged = Vec::new();

    for entry in entries {
        let external = entry.external();
        let has_id = external.is_some();
        if let Some(external) = external {
            if !by_external.insert(external) {
                continue;
            }
        }
        let key = (normalize_title(&entry.title), entry.media_type);
        match by_title.get(&key) {
            // Two distinct ids sharing a title are different works
            Some(&seen_with_id) if !(has_id && seen_with_id) => continue,
            Some(_) => {}
            None => {
                by_title.insert(key, has_id);
            }
        }
        merged.push(entry);
    }
    merged
}
