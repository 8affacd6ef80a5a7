//! Postgres-backed [`CouponStore`] over the `coupons` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpdb_core::{CanonicalCoupon, NewCoupon};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::store::{CouponFilter, CouponStore, IdentityMatch};
use crate::DbError;

const SELECT_COLUMNS: &str = "SELECT id, public_id, brand_name, coupon_code, coupon_title, \
     description, terms_and_conditions, detail_link, expire_by, owner_tag, source_name, \
     rendered_image, created_at, updated_at FROM coupons";

/// A row from the `coupons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponRow {
    pub id: i64,
    pub public_id: Uuid,
    pub brand_name: String,
    pub coupon_code: Option<String>,
    pub coupon_title: String,
    pub description: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub detail_link: Option<String>,
    pub expire_by: Option<DateTime<Utc>>,
    /// `NULL` for user-authored rows.
    pub owner_tag: Option<String>,
    pub source_name: Option<String>,
    /// Base64-encoded PNG.
    pub rendered_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CouponRow> for CanonicalCoupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            brand_name: row.brand_name,
            coupon_code: row.coupon_code,
            coupon_title: row.coupon_title,
            description: row.description,
            terms_and_conditions: row.terms_and_conditions,
            detail_link: row.detail_link,
            expire_by: row.expire_by,
            owner_tag: row.owner_tag,
            source_name: row.source_name,
            rendered_image: row.rendered_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgCouponStore {
    pool: PgPool,
}

impl PgCouponStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Appends ` WHERE ...` for `filter` to `builder`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CouponFilter) {
    match filter {
        CouponFilter::Identity {
            owner_tag,
            brand_name,
            key,
        } => {
            builder.push(" WHERE owner_tag = ");
            builder.push_bind(owner_tag.clone());
            builder.push(" AND brand_name = ");
            builder.push_bind(brand_name.clone());
            match key {
                IdentityMatch::Code(code) => {
                    builder.push(" AND upper(coupon_code) = upper(");
                    builder.push_bind(code.clone());
                    builder.push(")");
                }
                IdentityMatch::TitleWithin { title, from, to } => {
                    builder.push(" AND coupon_code IS NULL AND coupon_title = ");
                    builder.push_bind(title.clone());
                    builder.push(" AND expire_by >= ");
                    builder.push_bind(*from);
                    builder.push(" AND expire_by < ");
                    builder.push_bind(*to);
                }
                IdentityMatch::TitleWithoutExpiry { title } => {
                    builder.push(" AND coupon_code IS NULL AND coupon_title = ");
                    builder.push_bind(title.clone());
                    builder.push(" AND expire_by IS NULL");
                }
            }
        }
        CouponFilter::ExpiredBefore { owner_tag, cutoff } => {
            builder.push(" WHERE owner_tag = ");
            builder.push_bind(owner_tag.clone());
            builder.push(" AND expire_by < ");
            builder.push_bind(*cutoff);
        }
    }
}

#[async_trait]
impl CouponStore for PgCouponStore {
    async fn find_one(&self, filter: &CouponFilter) -> Result<Option<CanonicalCoupon>, DbError> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut builder, filter);
        // Oldest first when duplicates exist.
        builder.push(" ORDER BY id LIMIT 1");

        let row = builder
            .build_query_as::<CouponRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CanonicalCoupon::from))
    }

    async fn insert(&self, coupon: &NewCoupon) -> Result<CanonicalCoupon, DbError> {
        let draft = &coupon.draft;
        let row = sqlx::query_as::<_, CouponRow>(
            "INSERT INTO coupons \
                 (public_id, brand_name, coupon_code, coupon_title, description, \
                  terms_and_conditions, detail_link, expire_by, owner_tag, source_name, \
                  rendered_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id, public_id, brand_name, coupon_code, coupon_title, description, \
                       terms_and_conditions, detail_link, expire_by, owner_tag, source_name, \
                       rendered_image, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.brand_name)
        .bind(&draft.coupon_code)
        .bind(&draft.coupon_title)
        .bind(&draft.description)
        .bind(&draft.terms_and_conditions)
        .bind(&draft.detail_link)
        .bind(draft.expire_by)
        .bind(&coupon.owner_tag)
        .bind(&draft.source_name)
        .bind(&coupon.rendered_image)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn save(&self, coupon: &CanonicalCoupon) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE coupons SET \
                 brand_name           = $2, \
                 coupon_code          = $3, \
                 coupon_title         = $4, \
                 description          = $5, \
                 terms_and_conditions = $6, \
                 detail_link          = $7, \
                 expire_by            = $8, \
                 owner_tag            = $9, \
                 source_name          = $10, \
                 rendered_image       = $11, \
                 updated_at           = NOW() \
             WHERE id = $1",
        )
        .bind(coupon.id)
        .bind(&coupon.brand_name)
        .bind(&coupon.coupon_code)
        .bind(&coupon.coupon_title)
        .bind(&coupon.description)
        .bind(&coupon.terms_and_conditions)
        .bind(&coupon.detail_link)
        .bind(coupon.expire_by)
        .bind(&coupon.owner_tag)
        .bind(&coupon.source_name)
        .bind(&coupon.rendered_image)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete_many(&self, filter: &CouponFilter) -> Result<u64, DbError> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM coupons");
        push_filter(&mut builder, filter);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
