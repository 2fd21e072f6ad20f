use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A secret plexwatch needs, with its key in `credentials.toml` and the
/// environment variable that overrides it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    PlexToken,
    TautulliApiKey,
}

impl Secret {
    pub fn key(self) -> &'static str {
        match self {
            Secret::PlexToken => "plex_token",
            Secret::TautulliApiKey => "tautulli_api_key",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Secret::PlexToken => "PLEXWATCH_PLEX_TOKEN",
            Secret::TautulliApiKey => "PLEXWATCH_TAUTULLI_API_KEY",
        }
    }
}

/// Secrets kept apart from `config.toml` so the config can be shared
pub struct CredentialStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            values: BTreeMap::new(),
        }
    }

    /// A missing file is an empty store
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        self.values = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.values.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Environment first, so containers can inject secrets without a file
    pub fn secret(&self, secret: Secret) -> Option<String> {
        std::env::var(secret.env_var())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.get(secret.key()).cloned())
    }

    pub fn set_secret(&mut self, secret: Secret, value: String) {
        self.set(secret.key().to_string(), value);
    }

    pub fn get_plex_token(&self) -> Option<String> {
        self.secret(Secret::PlexToken)
    }

    pub fn set_plex_token(&mut self, token: String) {
        self.set_secret(Secret::PlexToken, token);
    }

    pub fn get_tautulli_api_key(&self) -> Option<String> {
        self.secret(Secret::TautulliApiKey)
    }

    pub fn set_tautulli_api_key(&mut self, api_key: String) {
        self.set_secret(Secret::TautulliApiKey, api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        let mut store = CredentialStore::new(path.clone());
        store.set_tautulli_api_key("tautulli_key".to_string());
        store.set("custom".to_string(), "value".to_string());
        store.save().unwrap();

        let mut reloaded = CredentialStore::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.get(Secret::TautulliApiKey.key()), Some(&"tautulli_key".to_string()));
        assert_eq!(reloaded.get("custom"), Some(&"value".to_string()));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.load().unwrap();
        assert_eq!(store.get(Secret::PlexToken.key()), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "plex_token = ").unwrap();
        assert!(CredentialStore::new(path).load().is_err());
    }

    #[test]
    fn test_remove() {
        let mut store = CredentialStore::new(PathBuf::from("unused.toml"));
        store.set("key1".to_string(), "value1".to_string());
        store.set("key2".to_string(), "value2".to_string());
        store.remove("key1");
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.get("key2"), Some(&"value2".to_string()));
    }
}
