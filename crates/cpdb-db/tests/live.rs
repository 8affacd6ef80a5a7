//! Live integration tests for the Postgres coupon store using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated database from the sqlx test harness.
//! The `migrations` path is relative to `crates/cpdb-db/`.

use chrono::{FixedOffset, TimeZone, Utc};
use cpdb_core::{CouponDraft, NewCoupon, OWNER_TAG};
use cpdb_db::{CouponFilter, CouponStore, DbError, PgCouponStore};

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn owned(code: Option<&str>, title: &str) -> NewCoupon {
    NewCoupon {
        draft: CouponDraft {
            source_name: "deals-a".to_string(),
            brand_name: "Acme".to_string(),
            coupon_code: code.map(str::to_string),
            coupon_title: title.to_string(),
            description: Some("desc".to_string()),
            terms_and_conditions: None,
            detail_link: Some("https://deals-a.example/acme".to_string()),
            expire_by: None,
        },
        owner_tag: Some(OWNER_TAG.to_string()),
        rendered_image: Some("aW1n".to_string()),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_then_find_by_code_case_insensitively(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    let inserted = store.insert(&owned(Some("SAVE10"), "Ten off")).await.unwrap();

    let lookup = owned(Some("save10"), "whatever").draft;
    let filter = CouponFilter::for_identity(&lookup.identity(&utc()), OWNER_TAG, &utc());
    let found = store.find_one(&filter).await.unwrap().unwrap();

    assert_eq!(found.id, inserted.id);
    assert_eq!(found.rendered_image.as_deref(), Some("aW1n"));
    assert_eq!(found.source_name.as_deref(), Some("deals-a"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn title_lookup_matches_same_day(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    let mut coupon = owned(None, "Free shipping");
    coupon.draft.expire_by = Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    let inserted = store.insert(&coupon).await.unwrap();

    let mut lookup = coupon.draft.clone();
    lookup.expire_by = Some(Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap());
    let filter = CouponFilter::for_identity(&lookup.identity(&utc()), OWNER_TAG, &utc());
    assert_eq!(store.find_one(&filter).await.unwrap().unwrap().id, inserted.id);

    lookup.expire_by = Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    let filter = CouponFilter::for_identity(&lookup.identity(&utc()), OWNER_TAG, &utc());
    assert!(store.find_one(&filter).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_overwrites_and_bumps_updated_at(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    let mut record = store.insert(&owned(Some("SAVE10"), "Ten off")).await.unwrap();
    record.coupon_title = "Ten percent off".to_string();
    record.description = None;
    store.save(&record).await.unwrap();

    let filter = CouponFilter::for_identity(
        &owned(Some("SAVE10"), "").draft.identity(&utc()),
        OWNER_TAG,
        &utc(),
    );
    let reloaded = store.find_one(&filter).await.unwrap().unwrap();
    assert_eq!(reloaded.coupon_title, "Ten percent off");
    assert!(reloaded.description.is_none());
    assert!(reloaded.updated_at >= record.updated_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn save_of_deleted_row_is_not_found(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    let mut record = store.insert(&owned(Some("SAVE10"), "Ten off")).await.unwrap();
    record.id += 1000;
    assert!(matches!(store.save(&record).await, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_many_spares_user_rows(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    let cutoff = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    let mut expired = owned(Some("OLD"), "Old");
    expired.draft.expire_by = Some(cutoff - chrono::Duration::days(1));
    store.insert(&expired).await.unwrap();

    let mut user_row = owned(Some("MINE"), "Mine");
    user_row.owner_tag = None;
    user_row.draft.expire_by = Some(cutoff - chrono::Duration::days(1));
    store.insert(&user_row).await.unwrap();

    let removed = store
        .delete_many(&CouponFilter::ExpiredBefore {
            owner_tag: OWNER_TAG.to_string(),
            cutoff,
        })
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

fn is_unique_violation(result: &Result<cpdb_core::CanonicalCoupon, DbError>) -> bool {
    matches!(
        result,
        Err(DbError::Sqlx(sqlx::Error::Database(e))) if e.is_unique_violation()
    )
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_owned_title_identity_is_rejected(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);

    store.insert(&owned(None, "Free shipping")).await.unwrap();
    let no_expiry_again = store.insert(&owned(None, "Free shipping")).await;
    assert!(is_unique_violation(&no_expiry_again), "got {no_expiry_again:?}");

    let mut dated = owned(None, "Free shipping");
    dated.draft.expire_by = Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    store.insert(&dated).await.unwrap();
    let dated_again = store.insert(&dated).await;
    assert!(is_unique_violation(&dated_again), "got {dated_again:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn title_uniqueness_ignores_user_rows_and_coded_rows(pool: sqlx::PgPool) {
    let store = PgCouponStore::new(pool);
    store.insert(&owned(None, "Free shipping")).await.unwrap();

    let mut user_row = owned(None, "Free shipping");
    user_row.owner_tag = None;
    store.insert(&user_row).await.unwrap();
    store.insert(&user_row).await.unwrap();

    store.insert(&owned(Some("SHIP"), "Free shipping")).await.unwrap();
}
