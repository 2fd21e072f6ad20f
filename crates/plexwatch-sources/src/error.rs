use thiserror::Error;

/// Failure talking to an external collaborator.
///
/// "Nothing found" is never an error; sources return empty results for that.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl SourceError {
    /// Timeouts, 5xx responses and connection failures
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Timeout(_) | SourceError::Network(_) => true,
            SourceError::Status { status, .. } => *status >= 500,
            SourceError::Parse(_) | SourceError::NotConfigured(_) => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(redact_url).unwrap_or_default();
        // reqwest's Display repeats the full url, api key included
        let e = e.without_url();
        if e.is_timeout() {
            SourceError::Timeout(url)
        } else if let Some(status) = e.status() {
            SourceError::Status { status: status.as_u16(), url }
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            let cause = std::error::Error::source(&e).map(|c| format!(": {}", c)).unwrap_or_default();
            if url.is_empty() {
                SourceError::Network(format!("{}{}", e, cause))
            } else {
                SourceError::Network(format!("{} ({}){}", e, url, cause))
            }
        }
    }
}

/// Url without its query string, where api keys travel
fn redact_url(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}
