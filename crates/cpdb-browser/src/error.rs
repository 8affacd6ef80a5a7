use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("detail extraction timed out after {secs}s for {url}")]
    ExtractionTimeout { url: String, secs: u64 },

    #[error("navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

impl BrowserError {
    /// Timeouts only affect the current page; the browser stays usable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BrowserError::ExtractionTimeout { .. })
    }
}
