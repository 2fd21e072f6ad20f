use crate::error::SourceError;
use crate::plex::api::PlexHttpClient;
use crate::traits::{ItemFilter, LibraryService};
use anyhow::Result;
use async_trait::async_trait;
use plexwatch_config::PlexConfig;
use plexwatch_models::{ItemPage, LibraryItem, MediaType, Section};
use std::time::Duration;
use tracing::{debug, instrument};

/// Plex Media Server library, read-only
pub struct PlexLibrary {
    api: PlexHttpClient,
}

impl PlexLibrary {
    pub fn new(token: &str, server_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api: PlexHttpClient::new(token, server_url, timeout)?,
        })
    }

    pub fn from_config(config: &PlexConfig, token: &str) -> Result<Self> {
        Self::new(token, &config.server_url, Duration::from_secs(config.request_timeout_secs))
    }

    pub fn server_url(&self) -> &str {
        self.api.server_url()
    }
}

/// Keep movie and series sections whose title is not excluded
/// (case-insensitive).
pub(crate) fn filter_sections(sections: Vec<Section>, exclude: &[String]) -> Vec<Section> {
    sections
        .into_iter()
        .filter(|s| s.media_type().is_some())
        .filter(|s| !exclude.iter().any(|e| e.trim().eq_ignore_ascii_case(s.title.trim())))
        .collect()
}

#[async_trait]
impl LibraryService for PlexLibrary {
    #[instrument(skip(self, exclude), fields(operation = "list_sections"))]
    async fn list_sections(&self, exclude: &[String]) -> Result<Vec<Section>, SourceError> {
        let all = self.api.get_sections().await?;
        let total = all.len();
        let sections = filter_sections(all, exclude);
        debug!("Plex: {} of {} sections are indexable", sections.len(), total);
        Ok(sections)
    }

    async fn list_items(&self, section_id: &str, filter: &ItemFilter) -> Result<ItemPage, SourceError> {
        self.api.get_section_items(section_id, filter).await
    }

    #[instrument(skip(self), fields(operation = "search"))]
    async fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        self.api.search(query, media_type).await
    }
}
