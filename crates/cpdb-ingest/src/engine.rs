//! Run orchestration: sources in order, offers in stream order, sweep last.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use cpdb_browser::DetailExtractor;
use cpdb_core::{CouponDraft, NewCoupon, RawOffer, OWNER_TAG};
use cpdb_db::{CouponFilter, CouponStore};
use cpdb_scraper::{FieldSegregator, NormalizeContext, SourceAdapter};
use futures::StreamExt;
use tokio::sync::Mutex;

use crate::cancel::CancelFlag;
use crate::clock::RunTimezone;
use crate::error::IngestError;
use crate::render::{DisplayFields, ImageRenderer};
use crate::report::{FailureScope, RunReport, SourceStatus, SourceSummary};
use crate::retry::RetryPolicy;
use crate::sweeper::ExpirySweeper;

/// Logged when a source lists cleanly but yields nothing.
const EMPTY_SOURCE_HINTS: [&str; 3] = [
    "listing markup may have changed so the item selector no longer matches",
    "the site may be blocking the scraper or serving a challenge page",
    "offers may only appear after client-side JavaScript runs",
];

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Pause between consecutive sources.
    pub inter_source_delay: Duration,
    /// Timezone used for same-day identity and the sweep cutoff.
    pub tz: RunTimezone,
    pub retry: RetryPolicy,
}

impl EngineSettings {
    /// Settings from the environment, following the host timezone.
    #[must_use]
    pub fn from_app_config(config: &cpdb_core::AppConfig) -> Self {
        Self {
            inter_source_delay: Duration::from_millis(config.inter_source_delay_ms),
            tz: RunTimezone::HostLocal,
            retry: RetryPolicy::from_app_config(config),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Added { id: i64 },
    Updated { id: i64 },
}

pub struct IngestionEngine {
    store: Arc<dyn CouponStore>,
    renderer: Option<Arc<dyn ImageRenderer>>,
    details: Option<Arc<dyn DetailExtractor>>,
    segregator: Option<Arc<dyn FieldSegregator>>,
    sweeper: ExpirySweeper,
    settings: EngineSettings,
    cancel: CancelFlag,
    running: Mutex<()>,
}

impl IngestionEngine {
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>, settings: EngineSettings) -> Self {
        let sweeper = ExpirySweeper::new(Arc::clone(&store), settings.tz, settings.retry);
        Self {
            store,
            renderer: None,
            details: None,
            segregator: None,
            sweeper,
            settings,
            cancel: CancelFlag::new(),
            running: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ImageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Arc<dyn DetailExtractor>) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_segregator(mut self, segregator: Arc<dyn FieldSegregator>) -> Self {
        self.segregator = Some(segregator);
        self
    }

    /// Handle that stops the current run (and every later one) at the next
    /// source or offer boundary.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    #[must_use]
    pub fn sweeper(&self) -> &ExpirySweeper {
        &self.sweeper
    }

    /// Ingest every adapter in order, then purge expired records.
    ///
    /// Never fails: source, record, browser and sweep failures are contained,
    /// logged, and listed on the returned report. A call made while another
    /// run is active returns at once with a run-scope failure.
    pub async fn run_all(&self, adapters: &[Box<dyn SourceAdapter>]) -> RunReport {
        let mut report = RunReport::begin();

        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!("ingestion run rejected: another run is in progress");
            report.record_failure(FailureScope::Run, "ingestion", "run already in progress");
            return report.finish();
        };

        tracing::info!(sources = adapters.len(), "ingestion run started");

        let wants_details = adapters.iter().any(|a| a.wants_details());
        let details = if wants_details {
            self.warm_up_details(&mut report).await
        } else {
            None
        };
        let now = Utc::now();
        let tz = self.settings.tz.offset_at(now);
        let today = now.with_timezone(&tz).date_naive();
        let ctx = NormalizeContext::plain(tz, today)
            .with_details(details)
            .with_segregator(self.segregator.as_deref());

        for (index, adapter) in adapters.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if index > 0 && !self.settings.inter_source_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_source_delay).await;
            }
            let summary = self.run_source(adapter.as_ref(), &ctx, &mut report).await;
            if summary.status == SourceStatus::Cancelled {
                report.cancelled = true;
            }
            report.sources.push(summary);
        }

        if report.cancelled || self.cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!("ingestion run cancelled; expiry sweep skipped");
        } else {
            match self.sweeper.purge().await {
                Ok(purged) => report.purged = purged,
                Err(e) => {
                    tracing::error!(error = %e, "expiry sweep failed");
                    report.record_failure(FailureScope::Sweep, "expiry-sweeper", e);
                }
            }
        }

        let report = report.finish();
        tracing::info!(
            added = report.added,
            updated = report.updated,
            purged = report.purged,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            duration_secs = report.duration_secs(),
            "ingestion run finished"
        );
        report
    }

    /// Match `draft` against storage by identity, then update or insert.
    ///
    /// Lookups only ever consider records tagged [`OWNER_TAG`] within the
    /// draft's brand. A renderer failure is logged and the record persists
    /// with whatever image it already had.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Store`] when storage fails permanently or keeps
    /// failing after the retry budget.
    pub async fn reconcile_and_persist(
        &self,
        draft: CouponDraft,
    ) -> Result<PersistOutcome, IngestError> {
        let retry = self.settings.retry;
        let tz = self.settings.tz.offset_at(Utc::now());
        let filter = CouponFilter::for_identity(&draft.identity(&tz), OWNER_TAG, &tz);

        let existing = retry
            .run("find_one", || self.store.find_one(&filter))
            .await?;

        let rendered_image = self.render_image(&draft);
        let incoming = NewCoupon {
            draft,
            owner_tag: Some(OWNER_TAG.to_string()),
            rendered_image,
        };

        if let Some(mut record) = existing {
            record.overwrite_from(&incoming);
            retry.run("save", || self.store.save(&record)).await?;
            tracing::debug!(id = record.id, coupon = %incoming.draft.label(), "coupon updated");
            Ok(PersistOutcome::Updated { id: record.id })
        } else {
            let record = retry.run("insert", || self.store.insert(&incoming)).await?;
            tracing::debug!(id = record.id, coupon = %incoming.draft.label(), "coupon added");
            Ok(PersistOutcome::Added { id: record.id })
        }
    }

    async fn warm_up_details(&self, report: &mut RunReport) -> Option<&dyn DetailExtractor> {
        let details = self.details.as_deref()?;
        match details.warm_up().await {
            Ok(()) => Some(details),
            Err(e) => {
                tracing::warn!(error = %e, "detail extraction unavailable; using listing data only");
                report.record_failure(FailureScope::Browser, "detail-extractor", e);
                None
            }
        }
    }

    async fn run_source(
        &self,
        adapter: &dyn SourceAdapter,
        ctx: &NormalizeContext<'_>,
        report: &mut RunReport,
    ) -> SourceSummary {
        let source = adapter.source_name();
        let mut summary = SourceSummary::new(source);
        tracing::info!(source, "scraping source");

        let mut offers = match adapter.list_offers().await {
            Ok(offers) => offers,
            Err(e) => {
                tracing::error!(source, error = %e, "failed to list offers; skipping source");
                report.record_failure(FailureScope::Source, source, e);
                summary.status = SourceStatus::ListingFailed;
                return summary;
            }
        };

        while let Some(item) = offers.next().await {
            if self.cancel.is_cancelled() {
                summary.status = SourceStatus::Cancelled;
                break;
            }
            let raw = match item {
                Ok(raw) => raw,
                Err(e) => {
                    summary.pages_failed += 1;
                    report.record_failure(FailureScope::Source, source, e);
                    continue;
                }
            };
            summary.offers += 1;
            let label = raw.label();
            match self.ingest_offer(adapter, raw, ctx).await {
                Ok(PersistOutcome::Added { .. }) => {
                    summary.added += 1;
                    report.added += 1;
                }
                Ok(PersistOutcome::Updated { .. }) => {
                    summary.updated += 1;
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::warn!(source, offer = %label, error = %e, "offer skipped");
                    summary.failed += 1;
                    report.record_failure(FailureScope::Record, format!("{source}: {label}"), e);
                }
            }
        }

        if summary.offers == 0 && summary.status == SourceStatus::Completed {
            if summary.pages_failed > 0 {
                summary.status = SourceStatus::ListingFailed;
                tracing::error!(
                    source,
                    pages_failed = summary.pages_failed,
                    "every listing page failed"
                );
            } else {
                summary.status = SourceStatus::Empty;
                tracing::warn!(source, "source returned no offers");
                for hint in EMPTY_SOURCE_HINTS {
                    tracing::info!(source, hint, "possible cause");
                }
            }
        }

        tracing::info!(
            source,
            offers = summary.offers,
            added = summary.added,
            updated = summary.updated,
            failed = summary.failed,
            pages_failed = summary.pages_failed,
            "source finished"
        );
        summary
    }

    async fn ingest_offer(
        &self,
        adapter: &dyn SourceAdapter,
        raw: RawOffer,
        ctx: &NormalizeContext<'_>,
    ) -> Result<PersistOutcome, IngestError> {
        let draft = adapter.normalize(raw, ctx).await?;
        self.reconcile_and_persist(draft).await
    }

    fn render_image(&self, draft: &CouponDraft) -> Option<String> {
        let renderer = self.renderer.as_deref()?;
        match renderer.render(&DisplayFields::from(draft)) {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(e) => {
                tracing::warn!(
                    coupon = %draft.label(),
                    error = %e,
                    "image render failed; keeping previous image"
                );
                None
            }
        }
    }
}
