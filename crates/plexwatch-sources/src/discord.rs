use crate::error::SourceError;
use crate::traits::Notifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use plexwatch_config::DiscordConfig;
use plexwatch_models::{NotificationPayload, TrackedEntry};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Discord rejects messages carrying more embeds than this
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

const EMBED_COLOR: u32 = 0xE5A00D;

pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String, username: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            webhook_url,
            username,
        })
    }

    pub fn from_config(config: &DiscordConfig, timeout: Duration) -> Result<Self> {
        Self::new(config.webhook_url.clone(), config.username.clone(), timeout)
    }

    async fn post(&self, message: &Value) -> Result<(), SourceError> {
        // The webhook token is part of the path, so the url is dropped entirely
        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| SourceError::from(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: "discord webhook".to_string(),
            });
        }
        Ok(())
    }
}

fn display_title(entry: &TrackedEntry) -> String {
    match entry.year {
        Some(year) => format!("{} ({})", entry.title, year),
        None => entry.title.clone(),
    }
}

fn embed_for(entry: &TrackedEntry, pending: usize) -> Value {
    let mut embed = json!({
        "title": display_title(entry),
        "description": format!("Now available on Plex ({})", entry.media_type),
        "color": EMBED_COLOR,
        "footer": { "text": format!("{} still pending", pending) },
    });
    if let Some(added_at) = entry.added_at {
        embed["timestamp"] = json!(added_at.to_rfc3339());
    }
    embed
}

/// Build the webhook messages for one cycle: one embed per newly available
/// title, at most ten per message. No news means no messages.
pub fn build_messages(payload: &NotificationPayload, username: &str) -> Vec<Value> {
    if !payload.has_news() {
        return Vec::new();
    }
    let pending = payload.pending_snapshot.len();
    let total = payload.newly_available.len();

    payload
        .newly_available
        .chunks(MAX_EMBEDS_PER_MESSAGE)
        .enumerate()
        .map(|(idx, chunk)| {
            let embeds: Vec<Value> = chunk.iter().map(|e| embed_for(e, pending)).collect();
            let mut message = json!({
                "username": username,
                "embeds": embeds,
            });
            if idx == 0 {
                message["content"] = json!(format!(
                    "{} watchlist {} now available",
                    total,
                    if total == 1 { "title is" } else { "titles are" }
                ));
            }
            message
        })
        .collect()
}

#[async_trait]
impl Notifier for DiscordWebhook {
    fn channel_name(&self) -> &str {
        "discord"
    }

    #[instrument(skip(self, payload), fields(operation = "notify"))]
    async fn notify(&self, payload: &NotificationPayload) -> Result<(), SourceError> {
        let messages = build_messages(payload, &self.username);
        if messages.is_empty() {
            debug!("Discord: nothing newly available, no message sent");
            return Ok(());
        }
        for message in &messages {
            self.post(message).await?;
        }
        info!(
            "Discord: announced {} titles in {} messages",
            payload.newly_available.len(),
            messages.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use plexwatch_models::{MediaType, WatchlistEntry};

    fn added(title: &str) -> TrackedEntry {
        let mut tracked = TrackedEntry::from_entry(&WatchlistEntry::new(title, Some(2010), MediaType::Movie));
        tracked.mark_added(Utc::now());
        tracked
    }

    #[test]
    fn test_no_news_builds_nothing() {
        let payload = NotificationPayload {
            newly_available: Vec::new(),
            pending_snapshot: vec![TrackedEntry::from_entry(&WatchlistEntry::new("Heat", None, MediaType::Movie))],
        };
        assert!(build_messages(&payload, "plexwatch").is_empty());
    }

    #[test]
    fn test_embeds_are_batched() {
        let newly_available: Vec<TrackedEntry> = (0..12).map(|i| added(&format!("Film {}", i))).collect();
        let payload = NotificationPayload {
            newly_available,
            pending_snapshot: Vec::new(),
        };

        let messages = build_messages(&payload, "plexwatch");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["embeds"].as_array().unwrap().len(), 10);
        assert_eq!(messages[1]["embeds"].as_array().unwrap().len(), 2);
        assert_eq!(messages[0]["content"], "12 watchlist titles are now available");
        assert!(messages[1].get("content").is_none());
        assert_eq!(messages[0]["embeds"][0]["title"], "Film 0 (2010)");
    }

    #[tokio::test]
    async fn test_connection_error_hides_webhook_token() {
        let webhook = DiscordWebhook::new(
            "http://127.0.0.1:9/api/webhooks/123/SECRETTOKEN".to_string(),
            "plexwatch".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let payload = NotificationPayload {
            newly_available: vec![added("Inception")],
            pending_snapshot: Vec::new(),
        };

        let err = webhook.notify(&payload).await.unwrap_err();
        assert!(!err.to_string().contains("SECRETTOKEN"), "token leaked: {}", err);
    }
}
