use super::prompts;
use super::runner::load_credentials;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, Attribute, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use plexwatch_config::{Config, FeedConfig, PathManager, TautulliConfig};
use plexwatch_sources::{LibraryService, PlexLibrary};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

pub async fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Show { full } => show_config(full, output),
        crate::ConfigCommands::Plex { server_url, token } => configure_plex(server_url, token, output).await,
        crate::ConfigCommands::Tautulli { url, api_key } => configure_tautulli(url, api_key, output),
        crate::ConfigCommands::Feed { name, url } => add_feed(name, url, output),
    }
}

/// Existing config, or defaults when there is no file yet
fn load_or_default(config_file: &PathBuf, output: &Output) -> Result<Config> {
    if config_file.exists() {
        Config::load_from_file(config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))
    } else {
        output.info("Configuration file not found. Creating default configuration...");
        Ok(Config::default())
    }
}

fn save(config: &Config, config_file: &PathBuf) -> Result<()> {
    config
        .save_to_file(config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config_file = paths.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'plexwatch config plex' to create one.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    let credentials = load_credentials(&paths)?;
    let secret = |value: Option<String>| match value {
        Some(v) if full => v,
        Some(v) => mask_string(&v),
        None => "<not set>".to_string(),
    };
    let plex_token = secret(credentials.get_plex_token());
    let tautulli_key = secret(credentials.get_tautulli_api_key());

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "plex": {
                "server_url": config.plex.server_url,
                "token": plex_token,
                "excluded_sections": config.plex.excluded_sections,
                "page_size": config.plex.page_size,
            },
            "tautulli": config.tautulli.as_ref().map(|t| json!({ "url": t.url, "api_key": tautulli_key })),
            "feeds": config.feeds.iter().map(|f| json!({ "name": f.name, "url": f.url })).collect::<Vec<_>>(),
            "discord": config.discord.as_ref().map(|d| json!({
                "webhook_url": if full { d.webhook_url.clone() } else { mask_string(&d.webhook_url) },
                "username": d.username,
            })),
            "matching": {
                "batch_size": config.matching.batch_size,
                "exhaustive_scan": config.matching.exhaustive_scan,
                "type_fallback": config.matching.type_fallback,
            },
            "schedule": config.scheduler_or_default().schedule,
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    println!("\n{} {}\n", "Configuration".bright_cyan().bold(), config_file.display().bright_black());

    let mut plex = section_table("Plex");
    plex.add_row(vec!["Server URL".to_string(), or_unset(&config.plex.server_url)]);
    plex.add_row(vec!["Token".to_string(), plex_token]);
    plex.add_row(vec![
        "Excluded sections".to_string(),
        if config.plex.excluded_sections.is_empty() {
            "-".to_string()
        } else {
            config.plex.excluded_sections.join(", ")
        },
    ]);
    plex.add_row(vec!["Page size".to_string(), config.plex.page_size.to_string()]);
    println!("{}\n", plex);

    match &config.tautulli {
        Some(tautulli) => {
            let mut table = section_table("Tautulli");
            table.add_row(vec!["URL".to_string(), tautulli.url.clone()]);
            table.add_row(vec!["API key".to_string(), tautulli_key]);
            println!("{}\n", table);
        }
        None => println!("{}\n", "Tautulli: Not configured".bright_black()),
    }

    let mut feeds = section_table("Feeds");
    if config.feeds.is_empty() {
        feeds.add_row(vec!["-".to_string(), "none configured".to_string()]);
    }
    for feed in &config.feeds {
        feeds.add_row(vec![feed.name.clone(), feed.url.clone()]);
    }
    println!("{}\n", feeds);

    match &config.discord {
        Some(discord) => {
            let mut table = section_table("Discord");
            let webhook = if full { discord.webhook_url.clone() } else { mask_string(&discord.webhook_url) };
            table.add_row(vec!["Webhook".to_string(), webhook]);
            table.add_row(vec!["Username".to_string(), discord.username.clone()]);
            println!("{}\n", table);
        }
        None => println!("{}\n", "Discord: Not configured".bright_black()),
    }

    let mut matching = section_table("Matching");
    matching.add_row(vec!["Batch size".to_string(), config.matching.batch_size.to_string()]);
    matching.add_row(vec!["Exhaustive scan".to_string(), yes_no(config.matching.exhaustive_scan)]);
    matching.add_row(vec!["Type fallback".to_string(), yes_no(config.matching.type_fallback)]);
    matching.add_row(vec!["Schedule".to_string(), config.scheduler_or_default().schedule]);
    println!("{}", matching);

    if let Err(e) = config.validate() {
        println!();
        output.warn(format!("Configuration is incomplete: {}", e));
    }
    Ok(())
}

async fn configure_plex(server_url_arg: Option<String>, token_arg: Option<String>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;
    let config_file = paths.config_file();
    let mut config = load_or_default(&config_file, output)?;
    let mut credentials = load_credentials(&paths)?;

    let server_url = match server_url_arg {
        Some(url) if prompts::is_http_url(&url) => url.trim().trim_end_matches('/').to_string(),
        Some(url) => return Err(eyre!("'{}' is not an http(s) URL", url)),
        None => {
            let existing = (!config.plex.server_url.is_empty()).then(|| config.plex.server_url.clone());
            prompts::prompt_url("Plex server URL", existing.as_deref())?
        }
    };

    let token = match token_arg {
        Some(token) => token.trim().to_string(),
        None => prompts::prompt_secret("Plex token (X-Plex-Token)", credentials.get_plex_token())?,
    };
    if token.is_empty() {
        return Err(eyre!("Plex token is required"));
    }

    verify_plex(&config, &server_url, &token, output).await;

    config.plex.server_url = server_url.clone();
    save(&config, &config_file)?;
    credentials.set_plex_token(token);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.success("Plex configuration saved!");
    output.println(format!("  Server URL: {}", server_url));
    Ok(())
}

/// Best-effort connectivity check; a failure only warns
async fn verify_plex(config: &Config, server_url: &str, token: &str, output: &Output) {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Connecting to Plex...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let timeout = Duration::from_secs(config.plex.request_timeout_secs);
    let result = match PlexLibrary::new(token, server_url, timeout) {
        Ok(library) => library
            .list_sections(&config.plex.excluded_sections)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    spinner.finish_and_clear();

    match result {
        Ok(sections) => {
            let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
            output.success(format!("Connected. Video sections: {}", titles.join(", ")));
        }
        Err(e) => output.warn(format!("Could not reach Plex ({}). Saving anyway.", e)),
    }
}

fn configure_tautulli(url_arg: Option<String>, api_key_arg: Option<String>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config_file = paths.config_file();
    let mut config = load_or_default(&config_file, output)?;
    let mut credentials = load_credentials(&paths)?;

    let url = match url_arg {
        Some(url) => url.trim().trim_end_matches('/').to_string(),
        None => prompts::prompt_url("Tautulli URL", config.tautulli.as_ref().map(|t| t.url.as_str()))?,
    };
    let api_key = match api_key_arg {
        Some(key) => key.trim().to_string(),
        None => prompts::prompt_secret("Tautulli API key", credentials.get_tautulli_api_key())?,
    };
    if api_key.is_empty() {
        return Err(eyre!("Tautulli API key is required"));
    }

    let timeout = config
        .tautulli
        .as_ref()
        .map(|t| t.request_timeout_secs)
        .unwrap_or(config.plex.request_timeout_secs);
    config.tautulli = Some(TautulliConfig {
        url: url.clone(),
        request_timeout_secs: timeout,
    });
    save(&config, &config_file)?;
    credentials.set_tautulli_api_key(api_key);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.success(format!("Tautulli configuration saved ({})", url));
    Ok(())
}

fn add_feed(name: String, url: String, output: &Output) -> Result<()> {
    if !prompts::is_http_url(&url) {
        return Err(eyre!("'{}' is not an http(s) URL", url));
    }
    let paths = PathManager::default();
    let config_file = paths.config_file();
    let mut config = load_or_default(&config_file, output)?;

    let url = url.trim().to_string();
    match config.feeds.iter_mut().find(|f| f.name.eq_ignore_ascii_case(&name)) {
        Some(existing) => {
            existing.url = url;
            output.info(format!("Updated feed '{}'", name));
        }
        None => {
            config.feeds.push(FeedConfig { name: name.clone(), url });
            output.info(format!("Added feed '{}'", name));
        }
    }
    save(&config, &config_file)?;
    output.success(format!("{} feed(s) configured", config.feeds.len()));
    Ok(())
}

fn section_table(title: &str) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    table
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<not set>".to_string()
    } else {
        value.to_string()
    }
}

fn yes_no(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}

fn mask_string(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return "<not set>".to_string();
    }
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abc"), "***");
        assert_eq!(mask_string("xyzPLEXtoken42"), "xy***42");
    }
}
