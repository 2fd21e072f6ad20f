use serde::{Deserialize, Serialize};
use crate::media::MediaType;

/// Outcome of resolving one watchlist entry against the library.
///
/// Built only through [`MatchResult::found`] and [`MatchResult::not_found`],
/// so a found result always carries a title and a type and a miss carries
/// neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    found: bool,
    matched_title: Option<String>,
    resolved_type: Option<MediaType>,
}

impl MatchResult {
    pub fn found(matched_title: impl Into<String>, resolved_type: MediaType) -> Self {
        Self {
            found: true,
            matched_title: Some(matched_title.into()),
            resolved_type: Some(resolved_type),
        }
    }

    pub fn not_found() -> Self {
        Self {
            found: false,
            matched_title: None,
            resolved_type: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn matched_title(&self) -> Option<&str> {
        self.matched_title.as_deref()
    }

    pub fn resolved_type(&self) -> Option<MediaType> {
        self.resolved_type
    }
}
