use std::sync::Arc;

use chrono::{DateTime, Utc};
use cpdb_core::{local_midnight, OWNER_TAG};
use cpdb_db::{CouponFilter, CouponStore, DbError};

use crate::clock::RunTimezone;
use crate::retry::RetryPolicy;

/// Purges machine-authored coupons whose expiry has passed.
///
/// Shared by the end of every ingestion run and the standalone purge schedule;
/// running it twice in a day deletes nothing the second time.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn CouponStore>,
    tz: RunTimezone,
    retry: RetryPolicy,
}

impl ExpirySweeper {
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>, tz: RunTimezone, retry: RetryPolicy) -> Self {
        Self { store, tz, retry }
    }

    /// Delete records tagged [`OWNER_TAG`] that expired before local midnight today.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails after retries.
    pub async fn purge(&self) -> Result<u64, DbError> {
        self.purge_at(Utc::now()).await
    }

    /// Same as [`purge`](Self::purge) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails after retries.
    pub async fn purge_at(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let tz = self.tz.offset_at(now);
        let cutoff = local_midnight(now.with_timezone(&tz).date_naive(), &tz);
        let filter = CouponFilter::ExpiredBefore {
            owner_tag: OWNER_TAG.to_string(),
            cutoff,
        };
        let purged = self
            .retry
            .run("delete_many", || self.store.delete_many(&filter))
            .await?;
        tracing::info!(purged, cutoff = %cutoff, "expired coupons purged");
        Ok(purged)
    }
}
