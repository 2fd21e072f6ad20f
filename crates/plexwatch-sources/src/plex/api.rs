use anyhow::{Context, Result};
use plexwatch_models::{ExternalId, ItemPage, LibraryItem, MediaType, Section};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::SourceError;
use crate::traits::ItemFilter;

const CLIENT_IDENTIFIER: &str = "plexwatch";

/// Plex numeric type codes used by `/library/sections/{id}/all`
fn type_code(media_type: MediaType) -> u8 {
    match media_type {
        MediaType::Movie => 1,
        MediaType::Series => 2,
    }
}

fn search_type(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movies",
        MediaType::Series => "tv",
    }
}

pub struct PlexHttpClient {
    client: Client,
    server_url: String,
}

impl PlexHttpClient {
    pub fn new(token: &str, server_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token)
                        .context("Invalid token format")?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static(CLIENT_IDENTIFIER),
                );
                headers
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn get_json(&self, url: &str, headers: &[(&'static str, String)]) -> Result<Value, SourceError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let json: Value = response.json().await?;
        Ok(json)
    }

    pub async fn get_sections(&self) -> Result<Vec<Section>, SourceError> {
        let url = format!("{}/library/sections", self.server_url);
        let json = self.get_json(&url, &[]).await?;
        Ok(parse_sections(&json))
    }

    pub async fn get_section_items(&self, section_id: &str, filter: &ItemFilter) -> Result<ItemPage, SourceError> {
        let url = section_items_url(&self.server_url, section_id, filter);
        let headers = [
            ("X-Plex-Container-Start", filter.page_start.to_string()),
            ("X-Plex-Container-Size", filter.page_size.to_string()),
        ];
        let json = self.get_json(&url, &headers).await?;
        let page = parse_item_page(&json, filter.media_type, section_id);
        debug!(
            section_id = section_id,
            start = filter.page_start,
            returned = page.items.len(),
            total = ?page.total_size,
            "Plex section page"
        );
        Ok(page)
    }

    pub async fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<LibraryItem>, SourceError> {
        let url = format!(
            "{}/library/search?query={}&searchTypes={}&includeGuids=1",
            self.server_url,
            urlencoding::encode(query),
            search_type(media_type)
        );
        let json = self.get_json(&url, &[]).await?;
        let results = parse_search_results(&json, media_type);
        debug!("Plex search: {} results for '{}' ({})", results.len(), query, media_type);
        Ok(results)
    }
}

pub(crate) fn section_items_url(server_url: &str, section_id: &str, filter: &ItemFilter) -> String {
    let mut url = format!(
        "{}/library/sections/{}/all?type={}&includeGuids=1",
        server_url,
        urlencoding::encode(section_id),
        type_code(filter.media_type)
    );
    if let Some((from, to)) = filter.year_range {
        url.push_str(&format!("&year>={}&year<={}", from, to));
    }
    url
}

fn str_or_number(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_year(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().map(|y| y as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Collect external ids from the `Guid` array and the legacy `guid` field.
/// Unrecognised or malformed GUIDs are skipped.
pub(crate) fn parse_guids(item: &Value) -> Vec<ExternalId> {
    let mut raw = Vec::new();
    match item.get("Guid") {
        Some(Value::Array(guid_array)) => {
            for guid_obj in guid_array {
                if let Some(id) = guid_obj.get("id").and_then(|i| i.as_str()) {
                    raw.push(id.to_string());
                } else if let Some(id_str) = guid_obj.as_str() {
                    raw.push(id_str.to_string());
                }
            }
        }
        Some(Value::Object(guid_obj)) => {
            if let Some(id) = guid_obj.get("id").and_then(|i| i.as_str()) {
                raw.push(id.to_string());
            }
        }
        _ => {}
    }
    if let Some(legacy) = item.get("guid").and_then(|g| g.as_str()) {
        raw.push(legacy.to_string());
    }

    let mut ids: Vec<ExternalId> = Vec::new();
    for guid in raw {
        match ExternalId::from_guid(&guid) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => {
                if !guid.starts_with("plex://") && !guid.starts_with("local://") {
                    debug!("Plex: ignoring unrecognised guid '{}'", guid);
                }
            }
        }
    }
    ids
}

/// Parse one metadata record. Records without a rating key or title are
/// unusable and return `None`.
pub(crate) fn parse_library_item(item: &Value, fallback_type: MediaType, fallback_section: &str) -> Option<LibraryItem> {
    let internal_key = str_or_number(item.get("ratingKey"))?;
    let title = item.get("title")?.as_str()?.to_string();
    let year = parse_year(item.get("year"));
    let media_type = item
        .get("type")
        .and_then(|t| t.as_str())
        .and_then(MediaType::from_type_name)
        .unwrap_or(fallback_type);
    let section_id = str_or_number(item.get("librarySectionID")).unwrap_or_else(|| fallback_section.to_string());

    let mut library_item = LibraryItem::new(internal_key, title, year, media_type, section_id);
    for id in parse_guids(item) {
        library_item.add_external_id(id);
    }
    Some(library_item)
}

pub(crate) fn parse_sections(json: &Value) -> Vec<Section> {
    let mut sections = Vec::new();
    let directories = json
        .get("MediaContainer")
        .and_then(|mc| mc.get("Directory"))
        .and_then(|d| d.as_array());

    if let Some(dir_array) = directories {
        for dir in dir_array {
            let Some(id) = str_or_number(dir.get("key")) else {
                continue;
            };
            let section_type = dir.get("type").and_then(|t| t.as_str()).unwrap_or("").to_string();
            let title = dir.get("title").and_then(|t| t.as_str()).unwrap_or("").to_string();
            sections.push(Section { id, section_type, title });
        }
    }
    sections
}

pub(crate) fn parse_item_page(json: &Value, media_type: MediaType, section_id: &str) -> ItemPage {
    let Some(media_container) = json.get("MediaContainer") else {
        debug!("Plex: no MediaContainer in section response");
        return ItemPage::default();
    };

    let total_size = media_container
        .get("totalSize")
        .and_then(|t| t.as_u64())
        .map(|t| t as usize);

    let mut items = Vec::new();
    let mut skipped = 0;
    if let Some(meta_array) = media_container.get("Metadata").and_then(|m| m.as_array()) {
        for item in meta_array {
            match parse_library_item(item, media_type, section_id) {
                Some(library_item) => items.push(library_item),
                None => skipped += 1,
            }
        }
    }
    if skipped > 0 {
        debug!("Plex: skipped {} records in section {} without key or title", skipped, section_id);
    }

    ItemPage { items, total_size }
}

/// Search responses come either as `SearchResult[].Metadata` (hub search)
/// or a flat `Metadata` array.
pub(crate) fn parse_search_results(json: &Value, media_type: MediaType) -> Vec<LibraryItem> {
    let Some(media_container) = json.get("MediaContainer") else {
        return Vec::new();
    };

    let mut records: Vec<&Value> = Vec::new();
    if let Some(results) = media_container.get("SearchResult").and_then(|r| r.as_array()) {
        records.extend(results.iter().filter_map(|r| r.get("Metadata")));
    }
    if let Some(meta_array) = media_container.get("Metadata").and_then(|m| m.as_array()) {
        records.extend(meta_array.iter());
    }

    records
        .into_iter()
        .filter_map(|record| parse_library_item(record, media_type, ""))
        .filter(|item| item.media_type == media_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexwatch_models::Provider;
    use serde_json::json;

    #[test]
    fn test_parse_sections() {
        let json = json!({
            "MediaContainer": {
                "Directory": [
                    {"key": "1", "type": "movie", "title": "Movies"},
                    {"key": "2", "type": "show", "title": "TV Shows"},
                    {"key": "3", "type": "artist", "title": "Music"}
                ]
            }
        });
        let sections = parse_sections(&json);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].media_type(), Some(MediaType::Series));
        assert_eq!(sections[2].media_type(), None);
    }

    #[test]
    fn test_parse_item_page_reads_guids_and_total() {
        let json = json!({
            "MediaContainer": {
                "totalSize": 412,
                "Metadata": [
                    {
                        "ratingKey": "1234",
                        "title": "Inception",
                        "year": 2010,
                        "type": "movie",
                        "librarySectionID": 1,
                        "guid": "plex://movie/5d776825880197001ec967c6",
                        "Guid": [
                            {"id": "imdb://tt1375666"},
                            {"id": "tmdb://27205"},
                            {"id": "tvdb://bogus"}
                        ]
                    },
                    {"title": "No key"}
                ]
            }
        });

        let page = parse_item_page(&json, MediaType::Movie, "1");
        assert_eq!(page.total_size, Some(412));
        assert_eq!(page.items.len(), 1);

        let item = &page.items[0];
        assert_eq!(item.internal_key, "1234");
        assert_eq!(item.section_id, "1");
        assert_eq!(item.year, Some(2010));
        assert_eq!(item.external_ids.len(), 2);
        assert_eq!(item.external_id_for(Provider::Tmdb).map(|e| e.id.as_str()), Some("27205"));
    }

    #[test]
    fn test_parse_legacy_agent_guid() {
        let json = json!({
            "ratingKey": 77,
            "title": "The Office",
            "type": "show",
            "guid": "com.plexapp.agents.thetvdb://73244?lang=en"
        });
        let item = parse_library_item(&json, MediaType::Movie, "2").unwrap();
        assert_eq!(item.internal_key, "77");
        assert_eq!(item.media_type, MediaType::Series);
        assert_eq!(item.external_id_for(Provider::Tvdb).map(|e| e.id.as_str()), Some("73244"));
    }

    #[test]
    fn test_parse_search_results_hub_shape_filters_type() {
        let json = json!({
            "MediaContainer": {
                "SearchResult": [
                    {"score": 0.9, "Metadata": {"ratingKey": "10", "title": "Dune", "year": 2021, "type": "movie"}},
                    {"score": 0.5, "Metadata": {"ratingKey": "11", "title": "Dune", "year": 2000, "type": "show"}}
                ]
            }
        });
        let movies = parse_search_results(&json, MediaType::Movie);
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].internal_key, "10");
    }

    #[test]
    fn test_section_items_url_with_year_range() {
        let filter = ItemFilter::new(MediaType::Series, 200).with_year_range(2011, 2009);
        let url = section_items_url("http://plex.local:32400", "2", &filter);
        assert_eq!(
            url,
            "http://plex.local:32400/library/sections/2/all?type=2&includeGuids=1&year>=2009&year<=2011"
        );
    }
}
