use cpdb_db::DbError;
use cpdb_scraper::ScraperError;
use thiserror::Error;

/// Why a single offer failed to make it into storage.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("normalization failed: {0}")]
    Normalize(#[from] ScraperError),

    #[error("storage error: {0}")]
    Store(#[from] DbError),
}
