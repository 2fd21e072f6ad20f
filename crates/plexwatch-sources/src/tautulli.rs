use crate::error::SourceError;
use crate::traits::SecondaryMetadataService;
use anyhow::{Context, Result};
use async_trait::async_trait;
use plexwatch_config::TautulliConfig;
use plexwatch_models::{ExternalId, LibraryItem, MediaType};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Tautulli search API used as a discovery hint for the library
pub struct TautulliClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TautulliClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &TautulliConfig, api_key: String) -> Result<Self> {
        Self::new(&config.url, api_key, Duration::from_secs(config.request_timeout_secs))
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/api/v2?apikey={}&cmd=search&query={}",
            self.base_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl SecondaryMetadataService for TautulliClient {
    fn service_name(&self) -> &str {
        "tautulli"
    }

    #[instrument(skip(self), fields(operation = "tautulli_search"))]
    async fn search_by_id_or_title(
        &self,
        section_scope: Option<&str>,
        query: &str,
    ) -> Result<Vec<LibraryItem>, SourceError> {
        let url = self.search_url(query);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // Never echo the api key back into logs
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: format!("{}/api/v2?cmd=search", self.base_url),
            });
        }

        let json: Value = response.json().await?;
        let candidates = parse_search_response(&json, section_scope)?;
        debug!("Tautulli: {} candidates for '{}'", candidates.len(), query);
        Ok(candidates)
    }
}

fn str_or_number(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_record(record: &Value, media_type: MediaType) -> Option<LibraryItem> {
    let rating_key = str_or_number(record.get("rating_key"))?;
    let title = record.get("title")?.as_str()?.to_string();
    let year = match record.get("year") {
        Some(Value::Number(n)) => n.as_u64().map(|y| y as u32),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    let section_id = str_or_number(record.get("section_id")).unwrap_or_default();

    let mut item = LibraryItem::new(rating_key, title, year, media_type, section_id);
    let guids = record
        .get("guids")
        .and_then(|g| g.as_array())
        .into_iter()
        .flatten()
        .filter_map(|g| g.as_str())
        .chain(record.get("guid").and_then(|g| g.as_str()));
    for guid in guids {
        if let Some(id) = ExternalId::from_guid(guid) {
            item.add_external_id(id);
        }
    }
    Some(item)
}

/// Candidates from `response.data.results_list.{movie,show}`
pub(crate) fn parse_search_response(json: &Value, section_scope: Option<&str>) -> Result<Vec<LibraryItem>, SourceError> {
    let response = json
        .get("response")
        .ok_or_else(|| SourceError::Parse("missing 'response' object".to_string()))?;

    if let Some(result) = response.get("result").and_then(|r| r.as_str()) {
        if result != "success" {
            let message = response.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error");
            return Err(SourceError::Parse(format!("tautulli returned '{}': {}", result, message)));
        }
    }

    let Some(results_list) = response.get("data").and_then(|d| d.get("results_list")) else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for (key, media_type) in [("movie", MediaType::Movie), ("show", MediaType::Series)] {
        let records = results_list.get(key).and_then(|r| r.as_array());
        for record in records.into_iter().flatten() {
            if let Some(item) = parse_record(record, media_type) {
                candidates.push(item);
            }
        }
    }

    if let Some(scope) = section_scope {
        candidates.retain(|c| c.section_id == scope);
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexwatch_models::Provider;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "response": {
                "result": "success",
                "message": null,
                "data": {
                    "results_count": 3,
                    "results_list": {
                        "movie": [
                            {
                                "rating_key": "1234",
                                "title": "Inception",
                                "year": 2010,
                                "section_id": 1,
                                "guids": ["imdb://tt1375666", "tmdb://27205"]
                            },
                            {"title": "No key"}
                        ],
                        "show": [
                            {"rating_key": 88, "title": "Inception: Behind", "year": "2011", "section_id": "2"}
                        ],
                        "episode": [
                            {"rating_key": "999", "title": "Pilot"}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_search_response() {
        let candidates = parse_search_response(&fixture(), None).unwrap();
        assert_eq!(candidates.len(), 2);

        let movie = &candidates[0];
        assert_eq!(movie.internal_key, "1234");
        assert_eq!(movie.section_id, "1");
        assert_eq!(movie.media_type, MediaType::Movie);
        assert!(movie.external_id_for(Provider::Imdb).is_some());

        let show = &candidates[1];
        assert_eq!(show.internal_key, "88");
        assert_eq!(show.year, Some(2011));
        assert_eq!(show.media_type, MediaType::Series);
    }

    #[test]
    fn test_parse_search_response_section_scope() {
        let candidates = parse_search_response(&fixture(), Some("2")).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].internal_key, "88");
    }

    #[test]
    fn test_parse_search_response_error_result() {
        let json = json!({"response": {"result": "error", "message": "Invalid apikey"}});
        let err = parse_search_response(&json, None).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_connection_error_hides_api_key() {
        // Nothing listens on the discard port
        let client = TautulliClient::new("http://127.0.0.1:9", "SUPERSECRETKEY".to_string(), Duration::from_secs(5)).unwrap();
        let err = client.search_by_id_or_title(None, "Inception").await.unwrap_err();

        let message = err.to_string();
        assert!(err.is_transient());
        assert!(!message.contains("SUPERSECRETKEY"), "api key leaked: {}", message);
        assert!(message.contains("127.0.0.1:9/api/v2"));
    }
}
