use serde::{Deserialize, Serialize};
use crate::external_id::{ExternalId, Provider};
use crate::media::MediaType;

/// A library section as reported by the media server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub id: String,
    /// Server-native section type ("movie", "show", "artist", "photo", ...)
    #[serde(rename = "type")]
    pub section_type: String,
    pub title: String,
}

impl Section {
    /// Media type for video sections, `None` for music/photo sections
    pub fn media_type(&self) -> Option<MediaType> {
        MediaType::from_type_name(&self.section_type)
    }
}

/// One movie or series in the remote library.
///
/// `internal_key` uniquely identifies the item on the server; any number of
/// external ids may point to the same item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryItem {
    pub canonical_title: String,
    pub year: Option<u32>,
    pub internal_key: String,
    pub media_type: MediaType,
    pub section_id: String,
    #[serde(default)]
    pub external_ids: Vec<ExternalId>,
}

impl LibraryItem {
    pub fn new(
        internal_key: impl Into<String>,
        canonical_title: impl Into<String>,
        year: Option<u32>,
        media_type: MediaType,
        section_id: impl Into<String>,
    ) -> Self {
        Self {
            canonical_title: canonical_title.into(),
            year,
            internal_key: internal_key.into(),
            media_type,
            section_id: section_id.into(),
            external_ids: Vec::new(),
        }
    }

    /// Add an id, ignoring duplicates
    pub fn add_external_id(&mut self, id: ExternalId) {
        if !self.external_ids.contains(&id) {
            self.external_ids.push(id);
        }
    }

    pub fn with_external_id(mut self, id: ExternalId) -> Self {
        self.add_external_id(id);
        self
    }

    pub fn has_external_id(&self, id: &ExternalId) -> bool {
        self.external_ids.contains(id)
    }

    pub fn external_id_for(&self, provider: Provider) -> Option<&ExternalId> {
        self.external_ids.iter().find(|e| e.provider == provider)
    }
}

/// One page of a paginated section listing
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<LibraryItem>,
    /// Total size reported by the server, when it reports one
    pub total_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_external_id_dedupes() {
        let id = ExternalId::new(Provider::Imdb, "tt1375666").unwrap();
        let mut item = LibraryItem::new("101", "Inception", Some(2010), MediaType::Movie, "1");
        item.add_external_id(id.clone());
        item.add_external_id(id.clone());
        assert_eq!(item.external_ids.len(), 1);
        assert!(item.has_external_id(&id));
        assert_eq!(item.external_id_for(Provider::Imdb), Some(&id));
        assert_eq!(item.external_id_for(Provider::Tvdb), None);
    }

    #[test]
    fn test_section_media_type() {
        let movies = Section { id: "1".into(), section_type: "movie".into(), title: "Movies".into() };
        let music = Section { id: "3".into(), section_type: "artist".into(), title: "Music".into() };
        assert_eq!(movies.media_type(), Some(MediaType::Movie));
        assert_eq!(music.media_type(), None);
    }
}
