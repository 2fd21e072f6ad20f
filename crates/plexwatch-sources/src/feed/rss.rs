use crate::error::SourceError;
use crate::traits::FeedSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use plexwatch_config::FeedConfig;
use plexwatch_models::{MediaType, Provider, WatchlistEntry};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Watchlist published as an RSS 2.0 document
pub struct RssFeed {
    name: String,
    url: String,
    client: Client,
}

impl RssFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }

    pub fn from_config(config: &FeedConfig, timeout: Duration) -> Result<Self> {
        Self::new(&config.name, &config.url, timeout)
    }

    async fn download(&self) -> Result<String, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FeedSource for RssFeed {
    fn source_name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(operation = "fetch_feed", feed = %self.name))]
    async fn fetch(&self) -> Vec<WatchlistEntry> {
        let body = match self.download().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Feed '{}' could not be fetched: {}", self.name, e);
                return Vec::new();
            }
        };
        match parse_rss(&body) {
            Ok(entries) => {
                debug!("Feed '{}': {} entries", self.name, entries.len());
                entries
            }
            Err(e) => {
                warn!("Feed '{}' is not valid RSS: {}", self.name, e);
                Vec::new()
            }
        }
    }
}

#[derive(Default)]
struct RawItem {
    title: Option<String>,
    guid: Option<String>,
    imdb_id: Option<String>,
    tmdb_id: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Guid,
    ImdbId,
    TmdbId,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Field::Title),
            b"guid" => Some(Field::Guid),
            b"imdbId" => Some(Field::ImdbId),
            b"tmdbId" => Some(Field::TmdbId),
            _ => None,
        }
    }
}

impl RawItem {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Guid => &mut self.guid,
            Field::ImdbId => &mut self.imdb_id,
            Field::TmdbId => &mut self.tmdb_id,
        }
    }

    fn push_text(&mut self, field: Field, text: &str) {
        let slot = self.slot(field);
        match slot {
            Some(existing) => existing.push_str(text),
            None => *slot = Some(text.to_string()),
        }
    }
}

/// Parse an RSS document into watchlist entries. Items without a title are
/// dropped.
pub fn parse_rss(xml: &str) -> Result<Vec<WatchlistEntry>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    current = Some(RawItem::default());
                } else if current.is_some() {
                    field = Field::from_tag(name.as_ref());
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    let text = t.unescape().map_err(|e| SourceError::Parse(e.to_string()))?;
                    item.push_text(f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.push_text(f, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(raw) = current.take() {
                        if let Some(entry) = build_entry(raw) {
                            entries.push(entry);
                        }
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// Split "Title (2010)" into ("Title", Some(2010))
fn split_title_year(raw: &str) -> (String, Option<u32>) {
    let trimmed = raw.trim();
    if let Some(open) = trimmed.rfind('(') {
        let inner = trimmed[open + 1..].strip_suffix(')');
        if let Some(year) = inner.filter(|y| y.len() == 4).and_then(|y| y.parse::<u32>().ok()) {
            let title = trimmed[..open].trim_end();
            if !title.is_empty() {
                return (title.to_string(), Some(year));
            }
        }
    }
    (trimmed.to_string(), None)
}

/// Ids carried by the guid URL
enum GuidId {
    Imdb(String),
    Tmdb { id: String, series: bool },
}

fn parse_guid_url(guid: &str) -> Option<GuidId> {
    let guid = guid.trim();
    if let Some(pos) = guid.find("imdb.com/title/") {
        let id = guid[pos + "imdb.com/title/".len()..].split('/').next()?;
        return Some(GuidId::Imdb(id.to_string()));
    }
    if let Some(pos) = guid.find("themoviedb.org/") {
        let mut parts = guid[pos + "themoviedb.org/".len()..].split('/');
        let kind = parts.next()?;
        let id: String = parts.next()?.chars().take_while(|c| c.is_ascii_digit()).collect();
        if id.is_empty() {
            return None;
        }
        return Some(GuidId::Tmdb { id, series: kind == "tv" });
    }
    None
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn build_entry(raw: RawItem) -> Option<WatchlistEntry> {
    let title = non_empty(raw.title)?;
    let (title, year) = split_title_year(&title);

    let guid = non_empty(raw.guid).and_then(|g| parse_guid_url(&g));
    let mut imdb_id = non_empty(raw.imdb_id);
    let mut tmdb_id = non_empty(raw.tmdb_id);
    let mut media_type = MediaType::Movie;

    match guid {
        Some(GuidId::Imdb(id)) => {
            imdb_id.get_or_insert(id);
        }
        Some(GuidId::Tmdb { id, series }) => {
            tmdb_id.get_or_insert(id);
            if series {
                media_type = MediaType::Series;
            }
        }
        None => {}
    }

    let entry = WatchlistEntry::new(title, year, media_type);
    let entry = match (imdb_id, tmdb_id) {
        (Some(id), _) => entry.with_external_id(Some(Provider::Imdb), id),
        (None, Some(id)) => entry.with_external_id(Some(Provider::Tmdb), id),
        (None, None) => entry,
    };
    Some(entry)
}
