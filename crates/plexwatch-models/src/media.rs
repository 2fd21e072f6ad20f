use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    #[serde(alias = "show", alias = "tv")]
    Series,
}

impl MediaType {
    /// The other media type, used when a watchlist source mis-tags an entry
    pub fn opposite(self) -> Self {
        match self {
            MediaType::Movie => MediaType::Series,
            MediaType::Series => MediaType::Movie,
        }
    }

    /// Parse the loose type names used by feeds and library servers
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "movie" | "movies" | "film" => Some(MediaType::Movie),
            "show" | "shows" | "series" | "tv" => Some(MediaType::Series),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
