use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use cpdb_browser::DetailExtractor;
use cpdb_core::{CouponDraft, RawOffer};
use futures::stream::BoxStream;

use crate::error::ScraperError;
use crate::segregation::FieldSegregator;

/// Per-run collaborators handed to [`SourceAdapter::normalize`].
#[derive(Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// `None` when the browser is disabled or failed to launch this run.
    pub details: Option<&'a dyn DetailExtractor>,
    pub segregator: Option<&'a dyn FieldSegregator>,
    /// Timezone expiry dates are interpreted in.
    pub tz: FixedOffset,
    /// Reference day for relative expiry text ("ends tomorrow").
    pub today: NaiveDate,
}

impl<'a> NormalizeContext<'a> {
    /// Listing-only context with no deep extraction or segregation.
    #[must_use]
    pub fn plain(tz: FixedOffset, today: NaiveDate) -> Self {
        Self {
            details: None,
            segregator: None,
            tz,
            today,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Option<&'a dyn DetailExtractor>) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn with_segregator(mut self, segregator: Option<&'a dyn FieldSegregator>) -> Self {
        self.segregator = segregator;
        self
    }
}

/// Offers in listing order. An `Err` item is a listing page that could not
/// be fetched; the stream carries on with the next page.
pub type OfferStream<'a> = BoxStream<'a, Result<RawOffer, ScraperError>>;

/// One coupon source. Implementations are values built from configuration.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_name(&self) -> &str;

    /// Whether [`normalize`](Self::normalize) uses the detail extractor. The
    /// browser is only launched when at least one adapter says yes.
    fn wants_details(&self) -> bool {
        false
    }

    /// Lazy, finite stream of offers. Not restartable; call again for a new
    /// pass. A listing page that fails shows up as one `Err` item and the
    /// pages after it are still fetched.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the source cannot be listed at all.
    async fn list_offers(&self) -> Result<OfferStream<'_>, ScraperError>;

    /// Map one scraped offer into a draft coupon.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Normalization`] when the offer cannot form a
    /// coupon (e.g. no brand, or neither title nor code).
    async fn normalize(
        &self,
        raw: RawOffer,
        ctx: &NormalizeContext<'_>,
    ) -> Result<CouponDraft, ScraperError>;
}
