use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalogs whose identifiers name a title across services
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Imdb,
    Tmdb,
    Tvdb,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Imdb, Provider::Tmdb, Provider::Tvdb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Imdb => "imdb",
            Provider::Tmdb => "tmdb",
            Provider::Tvdb => "tvdb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "imdb" => Some(Provider::Imdb),
            "tmdb" | "themoviedb" => Some(Provider::Tmdb),
            "tvdb" | "thetvdb" => Some(Provider::Tvdb),
            _ => None,
        }
    }

    /// Guess the provider from the shape of a raw id.
    ///
    /// Only IMDb ids are self-describing ("tt" followed by digits). Purely
    /// numeric ids are shared by TMDb and TVDB, so they stay ambiguous.
    pub fn infer_from_id(id: &str) -> Option<Self> {
        if is_imdb_id(id.trim()) {
            Some(Provider::Imdb)
        } else {
            None
        }
    }

    /// Check whether `id` has the format this provider issues
    pub fn accepts(&self, id: &str) -> bool {
        match self {
            Provider::Imdb => is_imdb_id(id),
            Provider::Tmdb | Provider::Tvdb => is_numeric_id(id),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_imdb_id(id: &str) -> bool {
    id.len() >= 9 && id.starts_with("tt") && id[2..].chars().all(|c| c.is_ascii_digit())
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && id.trim_start_matches('0') != ""
}

/// A (provider, id) pair such as (imdb, tt1375666)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExternalId {
    pub provider: Provider,
    pub id: String,
}

impl ExternalId {
    /// Build a validated identifier. Malformed ids yield `None` so callers can
    /// skip them and keep going with the rest of the record.
    pub fn new(provider: Provider, id: impl AsRef<str>) -> Option<Self> {
        let id = id.as_ref().trim();
        if provider.accepts(id) {
            Some(Self { provider, id: id.to_string() })
        } else {
            None
        }
    }

    /// Parse a Plex-style GUID.
    ///
    /// Accepted forms:
    /// - "imdb://tt1234567", "tmdb://27205", "tvdb://81189"
    /// - "com.plexapp.agents.imdb://tt1234567?lang=en"
    /// - "com.plexapp.agents.themoviedb://27205?lang=en"
    /// - "com.plexapp.agents.thetvdb://81189/1/1?lang=en"
    ///
    /// "plex://movie/5d77..." and other agent GUIDs return `None`.
    pub fn from_guid(guid: &str) -> Option<Self> {
        let (scheme, rest) = guid.trim().split_once("://")?;
        let agent = scheme.rsplit('.').next().unwrap_or(scheme);
        let provider = Provider::from_name(agent)?;
        let raw = rest
            .split(|c| c == '?' || c == '&' || c == '/')
            .next()
            .unwrap_or("");
        Self::new(provider, raw)
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}
