use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Largest batch of entries resolved concurrently within one cycle
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("plex.server_url is not configured")]
    MissingServerUrl,
    #[error("Plex token not found. Run 'plexwatch config plex' or set PLEXWATCH_PLEX_TOKEN")]
    MissingToken,
    #[error("no watchlist feeds configured")]
    NoFeeds,
    #[error("feed '{0}' has an empty url")]
    EmptyFeedUrl(String),
    #[error("matching.batch_size must be between 1 and 10, got {0}")]
    InvalidBatchSize(usize),
    #[error("plex.page_size must be greater than zero")]
    InvalidPageSize,
    #[error("tautulli.url is empty")]
    EmptyTautulliUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub plex: PlexConfig,
    #[serde(default)]
    pub tautulli: Option<TautulliConfig>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlexConfig {
    pub server_url: String,
    /// Section titles left out of indexing and scans
    #[serde(default)]
    pub excluded_sections: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TautulliConfig {
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    #[serde(default = "default_discord_username")]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Allow the exhaustive section scan as the last tier
    #[serde(default = "default_true")]
    pub exhaustive_scan: bool,
    /// Retry with the opposite media type when the declared one finds nothing
    #[serde(default = "default_true")]
    pub type_fallback: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            exhaustive_scan: true,
            type_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    200
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    5
}

fn default_discord_username() -> String {
    "plexwatch".to_string()
}

fn default_schedule() -> String {
    "0 */30 * * * *".to_string()  // Every 30 minutes (seconds field first)
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plex: PlexConfig {
                server_url: String::new(),
                excluded_sections: Vec::new(),
                page_size: default_page_size(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            tautulli: None,
            feeds: Vec::new(),
            discord: None,
            matching: MatchingConfig::default(),
            scheduler: Some(default_scheduler_config()),
            logging: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check everything a scan cycle relies on. Credentials are checked
    /// separately since they live outside this file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plex.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        if self.plex.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        if self.feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        for feed in &self.feeds {
            if feed.url.trim().is_empty() {
                return Err(ConfigError::EmptyFeedUrl(feed.name.clone()));
            }
        }
        if self.matching.batch_size == 0 || self.matching.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize(self.matching.batch_size));
        }
        if let Some(tautulli) = &self.tautulli {
            if tautulli.url.trim().is_empty() {
                return Err(ConfigError::EmptyTautulliUrl);
            }
        }
        Ok(())
    }

    pub fn scheduler_or_default(&self) -> SchedulerConfig {
        self.scheduler.clone().unwrap_or_else(default_scheduler_config)
    }
}
