use color_eyre::eyre::eyre;
use color_eyre::Result;
use plexwatch_config::{Config, ConfigError, CredentialStore, PathManager};
use plexwatch_core::{CycleRunner, JsonStateStore, MatchSettings};
use plexwatch_sources::{DiscordWebhook, FeedSource, PlexLibrary, RssFeed, TautulliClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Load `config.toml`, failing with a hint when it does not exist yet
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        return Err(eyre!(
            "Configuration file not found at {}. Run 'plexwatch config plex' and 'plexwatch config feed' first.",
            config_file.display()
        ));
    }
    Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

pub fn load_credentials(paths: &PathManager) -> Result<CredentialStore> {
    let credentials_file = paths.credentials_file();
    let mut store = CredentialStore::new(credentials_file.clone());
    store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    Ok(store)
}

/// Wire the collaborators named in the configuration into a cycle runner.
/// Configuration problems are reported here, before any cycle starts.
pub fn build_runner(config: &Config, paths: &PathManager, dry_run: bool) -> Result<CycleRunner> {
    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;
    let credentials = load_credentials(paths)?;
    let token = credentials
        .get_plex_token()
        .ok_or_else(|| eyre!("{}", ConfigError::MissingToken))?;

    let timeout = Duration::from_secs(config.plex.request_timeout_secs);
    let library = PlexLibrary::from_config(&config.plex, &token)
        .map_err(|e| eyre!("Failed to create Plex client: {}", e))?;

    let mut feeds: Vec<Arc<dyn FeedSource>> = Vec::with_capacity(config.feeds.len());
    for feed in &config.feeds {
        let source = RssFeed::from_config(feed, timeout)
            .map_err(|e| eyre!("Failed to create feed '{}': {}", feed.name, e))?;
        feeds.push(Arc::new(source));
    }

    let store = JsonStateStore::new(paths.state_file());
    debug!("Tracked state at {}", store.path().display());

    let mut runner = CycleRunner::new(feeds, Arc::new(library), Arc::new(store), MatchSettings::from_config(config))
        .with_batch_size(config.matching.batch_size)
        .with_dry_run(dry_run);

    if let Some(tautulli) = &config.tautulli {
        match credentials.get_tautulli_api_key() {
            Some(api_key) => {
                let client = TautulliClient::from_config(tautulli, api_key)
                    .map_err(|e| eyre!("Failed to create Tautulli client: {}", e))?;
                runner = runner.with_secondary(Arc::new(client));
            }
            None => warn!("Tautulli is configured but no API key is stored; skipping secondary lookups"),
        }
    }

    if let Some(discord) = &config.discord {
        let webhook = DiscordWebhook::from_config(discord, timeout)
            .map_err(|e| eyre!("Failed to create Discord notifier: {}", e))?;
        runner = runner.with_notifier(Arc::new(webhook));
    }

    Ok(runner)
}
