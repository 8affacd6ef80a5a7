//! Ingestion engine for the cpdb coupon pipeline.
//!
//! [`IngestionEngine::run_all`] drives every configured [`SourceAdapter`]
//! sequentially, reconciles each normalized offer against a [`CouponStore`],
//! and finishes with an [`ExpirySweeper`] pass.
//!
//! [`SourceAdapter`]: cpdb_scraper::SourceAdapter
//! [`CouponStore`]: cpdb_db::CouponStore

pub mod cancel;
pub mod clock;
pub mod engine;
pub mod error;
pub mod render;
pub mod report;
pub mod retry;
pub mod sweeper;

pub use cancel::CancelFlag;
pub use clock::RunTimezone;
pub use engine::{EngineSettings, IngestionEngine, PersistOutcome};
pub use error::IngestError;
pub use render::{CardRenderer, DisplayFields, ImageRenderer, RenderError};
pub use report::{FailureScope, RunFailure, RunReport, SourceStatus, SourceSummary};
pub use retry::RetryPolicy;
pub use sweeper::ExpirySweeper;
