use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::external_id::{ExternalId, Provider};
use crate::media::MediaType;
use crate::watchlist::WatchlistEntry;

/// Availability of a tracked watchlist item on the media server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    /// Not (or no longer) found in the library
    Pending,
    /// Confirmed available in the library
    Added,
}

/// Persisted lifecycle record of one watchlist item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedEntry {
    pub title: String,
    pub year: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub external_provider: Option<Provider>,
    #[serde(default)]
    pub external_id: Option<String>,
    pub status: TrackingStatus,
    #[serde(default, rename = "addedAt")]
    pub added_at: Option<DateTime<Utc>>,
}

impl TrackedEntry {
    /// First sighting of a watchlist entry
    pub fn from_entry(entry: &WatchlistEntry) -> Self {
        let external = entry.external();
        Self {
            title: entry.title.clone(),
            year: entry.year,
            media_type: entry.media_type,
            external_provider: external.as_ref().map(|e| e.provider).or(entry.external_provider),
            external_id: external.map(|e| e.id).or_else(|| entry.external_id.clone()),
            status: TrackingStatus::Pending,
            added_at: None,
        }
    }

    pub fn external(&self) -> Option<ExternalId> {
        let id = self.external_id.as_deref()?;
        let provider = self.external_provider.or_else(|| Provider::infer_from_id(id))?;
        ExternalId::new(provider, id)
    }

    /// Deduplication identity: the external (provider, id) pair when both
    /// sides have one, otherwise (title, type).
    pub fn is_same_item(&self, entry: &WatchlistEntry) -> bool {
        match (self.external(), entry.external()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => self.media_type == entry.media_type && titles_match(&self.title, &entry.title),
        }
    }

    pub fn is_added(&self) -> bool {
        self.status == TrackingStatus::Added
    }

    /// Transition to `Added`. Returns true when the entry was not added before.
    pub fn mark_added(&mut self, at: DateTime<Utc>) -> bool {
        if self.status == TrackingStatus::Added {
            return false;
        }
        self.status = TrackingStatus::Added;
        self.added_at = Some(at);
        true
    }

    /// Transition back to `Pending` (content removed upstream)
    pub fn mark_pending(&mut self) -> bool {
        if self.status == TrackingStatus::Pending {
            return false;
        }
        self.status = TrackingStatus::Pending;
        self.added_at = None;
        true
    }

    /// The watchlist entry this record was created from, used to re-check
    /// retained entries that have left the feed
    pub fn to_watchlist_entry(&self) -> WatchlistEntry {
        WatchlistEntry {
            title: self.title.clone(),
            year: self.year,
            media_type: self.media_type,
            external_provider: self.external_provider,
            external_id: self.external_id.clone(),
        }
    }

    /// Refresh descriptive fields from the latest feed sighting
    pub fn refresh_from(&mut self, entry: &WatchlistEntry) {
        self.title = entry.title.clone();
        if entry.year.is_some() {
            self.year = entry.year;
        }
        if self.external().is_none() {
            if let Some(external) = entry.external() {
                self.external_provider = Some(external.provider);
                self.external_id = Some(external.id);
            }
        }
    }
}

fn titles_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> WatchlistEntry {
        WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(Some(Provider::Imdb), "tt1375666")
    }

    #[test]
    fn test_from_entry_starts_pending() {
        let tracked = TrackedEntry::from_entry(&inception());
        assert_eq!(tracked.status, TrackingStatus::Pending);
        assert_eq!(tracked.added_at, None);
        assert_eq!(tracked.external_provider, Some(Provider::Imdb));
    }

    #[test]
    fn test_identity_by_external_id() {
        let tracked = TrackedEntry::from_entry(&inception());
        let renamed = WatchlistEntry::new("Inception (IMAX)", Some(2010), MediaType::Movie)
            .with_external_id(Some(Provider::Imdb), "tt1375666");
        assert!(tracked.is_same_item(&renamed));

        let other = WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(Some(Provider::Imdb), "tt0000001");
        assert!(!tracked.is_same_item(&other));
    }

    #[test]
    fn test_identity_falls_back_to_title_and_type() {
        let tracked = TrackedEntry::from_entry(&WatchlistEntry::new("Dune", None, MediaType::Movie));
        assert!(!tracked.is_same_item(&inception()));
        assert!(tracked.is_same_item(&WatchlistEntry::new("dune ", Some(2021), MediaType::Movie)));
        assert!(!tracked.is_same_item(&WatchlistEntry::new("Dune", None, MediaType::Series)));
    }

    #[test]
    fn test_status_transitions() {
        let mut tracked = TrackedEntry::from_entry(&inception());
        let now = Utc::now();
        assert!(tracked.mark_added(now));
        assert!(!tracked.mark_added(now));
        assert_eq!(tracked.added_at, Some(now));
        assert!(tracked.mark_pending());
        assert_eq!(tracked.added_at, None);
        assert!(!tracked.mark_pending());
    }
}
