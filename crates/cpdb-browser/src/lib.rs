//! Shared headless Chromium session for JS-rendered coupon detail pages.
//!
//! One browser per process, launched lazily and closed explicitly. Every
//! extraction gets its own page, which is always closed afterwards.

mod error;
mod executable;
mod manager;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::BrowserError;
pub use executable::{find_chrome_executable, resolve_executable};
pub use manager::{BrowserManager, BrowserSettings};

/// Best-effort fields pulled off a rendered detail page. Every field is
/// independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub terms: Vec<String>,
    pub expiry_text: Option<String>,
}

impl DetailRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.terms.is_empty()
            && self.expiry_text.is_none()
    }
}

/// Source-specific extraction over a rendered DOM snapshot.
pub trait DomExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &str) -> DetailRecord;

    /// Per-source navigation timeout; `None` uses the manager default.
    fn nav_timeout(&self) -> Option<Duration> {
        None
    }

    /// Per-source settle period after navigation; `None` uses the manager default.
    fn settle(&self) -> Option<Duration> {
        None
    }
}

/// Deep extraction as seen by adapters and the ingestion engine.
#[async_trait]
pub trait DetailExtractor: Send + Sync {
    /// Make sure the underlying browser is usable before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] if the browser cannot be started.
    async fn warm_up(&self) -> Result<(), BrowserError>;

    /// Render `url` and run `extractor` over it. `None` when the page could
    /// not be rendered; callers fall back to listing data.
    async fn extract_details(
        &self,
        url: &str,
        extractor: &dyn DomExtractor,
    ) -> Option<DetailRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty() {
        assert!(DetailRecord::default().is_empty());
    }

    #[test]
    fn record_with_terms_is_not_empty() {
        let record = DetailRecord {
            terms: vec!["Valid on orders over $50.".to_string()],
            ..DetailRecord::default()
        };
        assert!(!record.is_empty());
    }
}
