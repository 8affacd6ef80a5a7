//! In-process [`CouponStore`] for dry runs and tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use cpdb_core::{CanonicalCoupon, NewCoupon};
use uuid::Uuid;

use crate::store::{CouponFilter, CouponStore};
use crate::DbError;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: Vec<CanonicalCoupon>,
}

/// Vec-backed store evaluating filters with [`CouponFilter::matches`].
#[derive(Debug, Default)]
pub struct MemoryCouponStore {
    inner: Mutex<Inner>,
}

impl MemoryCouponStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, e.g. user-authored coupons.
    #[must_use]
    pub fn with_records(records: Vec<CanonicalCoupon>) -> Self {
        let next_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            inner: Mutex::new(Inner { next_id, records }),
        }
    }

    /// Copy of every record, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CanonicalCoupon> {
        self.lock().records.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CouponStore for MemoryCouponStore {
    async fn find_one(&self, filter: &CouponFilter) -> Result<Option<CanonicalCoupon>, DbError> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|r| filter.matches(r))
            .cloned())
    }

    async fn insert(&self, coupon: &NewCoupon) -> Result<CanonicalCoupon, DbError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let now = Utc::now();
        let draft = &coupon.draft;
        let record = CanonicalCoupon {
            id: inner.next_id,
            public_id: Uuid::new_v4(),
            brand_name: draft.brand_name.clone(),
            coupon_code: draft.coupon_code.clone(),
            coupon_title: draft.coupon_title.clone(),
            description: draft.description.clone(),
            terms_and_conditions: draft.terms_and_conditions.clone(),
            detail_link: draft.detail_link.clone(),
            expire_by: draft.expire_by,
            owner_tag: coupon.owner_tag.clone(),
            source_name: Some(draft.source_name.clone()),
            rendered_image: coupon.rendered_image.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn save(&self, coupon: &CanonicalCoupon) -> Result<(), DbError> {
        let mut inner = self.lock();
        let slot = inner
            .records
            .iter_mut()
            .find(|r| r.id == coupon.id)
            .ok_or(DbError::NotFound)?;
        let created_at = slot.created_at;
        *slot = coupon.clone();
        slot.created_at = created_at;
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_many(&self, filter: &CouponFilter) -> Result<u64, DbError> {
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|r| !filter.matches(r));
        Ok(u64::try_from(before - inner.records.len()).unwrap_or_default())
    }
}
