use serde::{Deserialize, Serialize};
use crate::external_id::{ExternalId, Provider};
use crate::media::MediaType;

/// One item read from a watchlist feed. Re-derived every cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub title: String,
    pub year: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl WatchlistEntry {
    pub fn new(title: impl Into<String>, year: Option<u32>, media_type: MediaType) -> Self {
        Self {
            title: title.into(),
            year,
            media_type,
            external_provider: None,
            external_id: None,
        }
    }

    pub fn with_external_id(mut self, provider: Option<Provider>, id: impl Into<String>) -> Self {
        self.external_provider = provider;
        self.external_id = Some(id.into());
        self
    }

    /// The same entry re-tagged with another media type
    pub fn with_media_type(&self, media_type: MediaType) -> Self {
        Self {
            media_type,
            ..self.clone()
        }
    }

    /// Validated external identifier.
    ///
    /// Feeds sometimes publish a raw id without tagging its provider; in that
    /// case the provider is inferred from the id's shape when possible.
    pub fn external(&self) -> Option<ExternalId> {
        let id = self.external_id.as_deref()?;
        let provider = self.external_provider.or_else(|| Provider::infer_from_id(id))?;
        ExternalId::new(provider, id)
    }

    pub fn has_external_id(&self) -> bool {
        self.external_id.as_deref().map(|id| !id.trim().is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_with_tagged_provider() {
        let entry = WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(Some(Provider::Imdb), "tt1375666");
        assert_eq!(entry.external(), ExternalId::new(Provider::Imdb, "tt1375666"));
    }

    #[test]
    fn test_external_infers_untagged_imdb() {
        let entry = WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(None, "tt1375666");
        assert_eq!(entry.external(), ExternalId::new(Provider::Imdb, "tt1375666"));
    }

    #[test]
    fn test_external_untagged_numeric_is_ambiguous() {
        let entry = WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(None, "27205");
        assert!(entry.has_external_id());
        assert_eq!(entry.external(), None);
    }

    #[test]
    fn test_external_malformed_is_dropped() {
        let entry = WatchlistEntry::new("Inception", Some(2010), MediaType::Movie)
            .with_external_id(Some(Provider::Tmdb), "tt1375666");
        assert_eq!(entry.external(), None);
    }
}
