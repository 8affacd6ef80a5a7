use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid selector {selector:?} for source {source_name}: {reason}")]
    InvalidSelector {
        source_name: String,
        selector: String,
        reason: String,
    },

    #[error("cannot normalize offer {label}: {reason}")]
    Normalization { label: String, reason: String },
}

impl ScraperError {
    /// 429s and network failures are worth another attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ScraperError::RateLimited { .. } | ScraperError::Http(_)
        )
    }

    /// Server-requested wait before the next attempt, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}
