use color_eyre::Result;
use dialoguer::{Input, Password};

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default_value) = default {
        input = input.default(default_value.to_string());
    }
    input
        .interact_text()
        .map(|s| s.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt until the answer looks like an http(s) URL
pub fn prompt_url(prompt: &str, default: Option<&str>) -> Result<String> {
    loop {
        let value = prompt_string(prompt, default)?;
        if is_http_url(&value) {
            return Ok(value.trim_end_matches('/').to_string());
        }
        eprintln!("Please enter a URL starting with http:// or https://");
    }
}

/// Masked prompt. An empty answer keeps `existing` when there is one.
pub fn prompt_secret(prompt: &str, existing: Option<String>) -> Result<String> {
    let prompt = if existing.is_some() {
        format!("{} (leave empty to keep current)", prompt)
    } else {
        prompt.to_string()
    };
    let value = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(existing.is_some())
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read secret: {}", e))?;

    match (value.trim().is_empty(), existing) {
        (true, Some(current)) => Ok(current),
        _ => Ok(value.trim().to_string()),
    }
}

pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("http://") || value.starts_with("https://")) && value.len() > "https://".len()
}
