//! The storage seam used by the ingestion engine and the sweeper.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use cpdb_core::{day_range, local_midnight, CanonicalCoupon, CouponIdentity, IdentityKey, NewCoupon};

use crate::DbError;

/// Document-store operations over [`CanonicalCoupon`] records.
///
/// `find_one` followed by `insert`/`save` is not atomic; callers run one
/// ingestion at a time.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn find_one(&self, filter: &CouponFilter) -> Result<Option<CanonicalCoupon>, DbError>;

    async fn insert(&self, coupon: &NewCoupon) -> Result<CanonicalCoupon, DbError>;

    /// Persist every field of an existing record. Fails with
    /// [`DbError::NotFound`] if the record no longer exists.
    async fn save(&self, coupon: &CanonicalCoupon) -> Result<(), DbError>;

    /// Returns the number of records removed.
    async fn delete_many(&self, filter: &CouponFilter) -> Result<u64, DbError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponFilter {
    /// Reconciliation lookup, always scoped to one brand and one owner tag.
    Identity {
        owner_tag: String,
        brand_name: String,
        key: IdentityMatch,
    },
    /// Records owned by `owner_tag` whose `expire_by` is strictly before `cutoff`.
    ExpiredBefore {
        owner_tag: String,
        cutoff: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityMatch {
    /// Case-insensitive code match.
    Code(String),
    /// Code-less record with this title expiring within `[from, to)`.
    TitleWithin {
        title: String,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Code-less record with this title and no expiry.
    TitleWithoutExpiry { title: String },
}

impl CouponFilter {
    /// Lookup filter for `identity`, owned by `owner_tag`, with day buckets in `tz`.
    #[must_use]
    pub fn for_identity(identity: &CouponIdentity, owner_tag: &str, tz: &FixedOffset) -> Self {
        let key = match &identity.key {
            IdentityKey::Code(code) => IdentityMatch::Code(code.to_uppercase()),
            IdentityKey::Title {
                title,
                expire_day: Some(day),
            } => {
                let from = local_midnight(*day, tz);
                let (_, to) = day_range(from, tz);
                IdentityMatch::TitleWithin {
                    title: title.clone(),
                    from,
                    to,
                }
            }
            IdentityKey::Title {
                title,
                expire_day: None,
            } => IdentityMatch::TitleWithoutExpiry {
                title: title.clone(),
            },
        };

        CouponFilter::Identity {
            owner_tag: owner_tag.to_string(),
            brand_name: identity.brand_name.clone(),
            key,
        }
    }

    /// In-process evaluation, mirroring the SQL built by [`crate::PgCouponStore`].
    #[must_use]
    pub fn matches(&self, coupon: &CanonicalCoupon) -> bool {
        match self {
            CouponFilter::Identity {
                owner_tag,
                brand_name,
                key,
            } => {
                if coupon.owner_tag.as_deref() != Some(owner_tag.as_str())
                    || coupon.brand_name != *brand_name
                {
                    return false;
                }
                match key {
                    IdentityMatch::Code(code) => coupon
                        .coupon_code
                        .as_deref()
                        .is_some_and(|c| c.to_uppercase() == code.to_uppercase()),
                    IdentityMatch::TitleWithin { title, from, to } => {
                        coupon.coupon_code.is_none()
                            && coupon.coupon_title == *title
                            && coupon
                                .expire_by
                                .is_some_and(|at| at >= *from && at < *to)
                    }
                    IdentityMatch::TitleWithoutExpiry { title } => {
                        coupon.coupon_code.is_none()
                            && coupon.coupon_title == *title
                            && coupon.expire_by.is_none()
                    }
                }
            }
            CouponFilter::ExpiredBefore { owner_tag, cutoff } => {
                coupon.owner_tag.as_deref() == Some(owner_tag.as_str())
                    && coupon.expire_by.is_some_and(|at| at < *cutoff)
            }
        }
    }
}
