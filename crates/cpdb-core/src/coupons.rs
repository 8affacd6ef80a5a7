//! Coupon shapes that flow through the ingestion pipeline.
//!
//! A [`RawOffer`] is whatever an adapter scraped off a listing page. Adapters
//! normalize it into a [`CouponDraft`], which the engine reconciles against
//! storage and persists as a [`CanonicalCoupon`].

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner tag stamped on every record the scraper writes. The sweeper only ever
/// deletes records carrying this tag.
pub const OWNER_TAG: &str = "cpdb-scraper";

/// Loosely-typed offer as scraped from a listing page. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOffer {
    pub source_name: String,
    pub brand_name: Option<String>,
    pub title: Option<String>,
    pub code: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub terms_text: Option<String>,
    pub expiry_text: Option<String>,
    /// Source-specific leftovers an adapter may want during normalization.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawOffer {
    /// Short `brand / title` label for log lines and failure reports.
    #[must_use]
    pub fn label(&self) -> String {
        let brand = self.brand_name.as_deref().unwrap_or("<unknown brand>");
        let title = self
            .title
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or("<untitled>");
        format!("{brand} / {title}")
    }
}

/// A normalized coupon that has not been reconciled against storage yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDraft {
    pub source_name: String,
    pub brand_name: String,
    /// Uppercase, trimmed. `None` when the offer has no code (deal-only offers).
    pub coupon_code: Option<String>,
    pub coupon_title: String,
    pub description: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub detail_link: Option<String>,
    pub expire_by: Option<DateTime<Utc>>,
}

impl CouponDraft {
    /// Identity used for reconciliation, bucketing `expire_by` by calendar day in `tz`.
    #[must_use]
    pub fn identity(&self, tz: &FixedOffset) -> CouponIdentity {
        let key = match self.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => IdentityKey::Code(code.to_uppercase()),
            _ => IdentityKey::Title {
                title: self.coupon_title.trim().to_string(),
                expire_day: self
                    .expire_by
                    .map(|at| at.with_timezone(tz).date_naive()),
            },
        };
        CouponIdentity {
            brand_name: self.brand_name.trim().to_string(),
            key,
        }
    }

    /// `brand / code-or-title` label for log lines and failure reports.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            self.brand_name,
            self.coupon_code.as_deref().unwrap_or(&self.coupon_title)
        )
    }
}

/// Reconciliation identity of a coupon within one brand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CouponIdentity {
    pub brand_name: String,
    pub key: IdentityKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Uppercase coupon code.
    Code(String),
    /// Title plus the local calendar day of `expire_by` (`None` when the offer
    /// has no expiry).
    Title {
        title: String,
        expire_day: Option<NaiveDate>,
    },
}

/// A draft ready to be inserted, with ownership and image attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub draft: CouponDraft,
    pub owner_tag: Option<String>,
    /// Base64-encoded PNG.
    pub rendered_image: Option<String>,
}

/// A coupon record as held by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCoupon {
    pub id: i64,
    pub public_id: Uuid,
    pub brand_name: String,
    pub coupon_code: Option<String>,
    pub coupon_title: String,
    pub description: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub detail_link: Option<String>,
    pub expire_by: Option<DateTime<Utc>>,
    /// `Some(OWNER_TAG)` for machine-authored records.
    pub owner_tag: Option<String>,
    pub source_name: Option<String>,
    /// Base64-encoded PNG of the last successful render.
    pub rendered_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalCoupon {
    #[must_use]
    pub fn is_machine_authored(&self) -> bool {
        self.owner_tag.as_deref() == Some(OWNER_TAG)
    }

    /// Full-field overwrite from the latest sighting.
    ///
    /// `rendered_image` is only replaced when the new sighting produced one, so
    /// a renderer outage never erases the last good image. Timestamps are left
    /// to storage.
    pub fn overwrite_from(&mut self, incoming: &NewCoupon) {
        let draft = &incoming.draft;
        self.brand_name.clone_from(&draft.brand_name);
        self.coupon_code.clone_from(&draft.coupon_code);
        self.coupon_title.clone_from(&draft.coupon_title);
        self.description.clone_from(&draft.description);
        self.terms_and_conditions
            .clone_from(&draft.terms_and_conditions);
        self.detail_link.clone_from(&draft.detail_link);
        self.expire_by = draft.expire_by;
        self.owner_tag.clone_from(&incoming.owner_tag);
        self.source_name = Some(draft.source_name.clone());
        if incoming.rendered_image.is_some() {
            self.rendered_image.clone_from(&incoming.rendered_image);
        }
    }
}

/// UTC instant of local midnight at the start of `day` in `tz`.
#[must_use]
pub fn local_midnight(day: NaiveDate, tz: &FixedOffset) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive).earliest().map_or_else(
        || Utc.from_utc_datetime(&naive),
        |local| local.with_timezone(&Utc),
    )
}

/// Half-open `[start, end)` UTC range covering the local calendar day of `instant`.
#[must_use]
pub fn day_range(instant: DateTime<Utc>, tz: &FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(instant.with_timezone(tz).date_naive(), tz);
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn draft(code: Option<&str>, title: &str, expire_by: Option<DateTime<Utc>>) -> CouponDraft {
        CouponDraft {
            source_name: "test".to_string(),
            brand_name: "Acme".to_string(),
            coupon_code: code.map(str::to_string),
            coupon_title: title.to_string(),
            description: None,
            terms_and_conditions: None,
            detail_link: None,
            expire_by,
        }
    }

    #[test]
    fn identity_prefers_code_and_uppercases_it() {
        let id = draft(Some(" save10 "), "Ten off", None).identity(&utc());
        assert_eq!(id.brand_name, "Acme");
        assert_eq!(id.key, IdentityKey::Code("SAVE10".to_string()));
    }

    #[test]
    fn identity_ignores_title_when_code_present() {
        let a = draft(Some("SAVE10"), "Ten off", None).identity(&utc());
        let b = draft(Some("save10"), "10% off everything", None).identity(&utc());
        assert_eq!(a, b);
    }

    #[test]
    fn identity_falls_back_to_title_and_day() {
        let morning = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 3, 1, 22, 30, 0).unwrap();
        let a = draft(None, "Free shipping", Some(morning)).identity(&utc());
        let b = draft(None, "Free shipping", Some(evening)).identity(&utc());
        assert_eq!(a, b);
        assert!(matches!(
            a.key,
            IdentityKey::Title { expire_day: Some(d), .. } if d == NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        ));
    }

    #[test]
    fn empty_code_counts_as_missing() {
        let id = draft(Some("  "), "Free shipping", None).identity(&utc());
        assert!(matches!(id.key, IdentityKey::Title { expire_day: None, .. }));
    }

    #[test]
    fn day_bucket_respects_timezone() {
        // 23:30 UTC on Mar 1 is already Mar 2 in UTC+2.
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let id = draft(None, "Deal", Some(late)).identity(&plus_two);
        assert!(matches!(
            id.key,
            IdentityKey::Title { expire_day: Some(d), .. } if d == NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        ));
    }

    #[test]
    fn day_range_spans_one_local_day() {
        let noon = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (start, end) = day_range(noon, &utc());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn local_midnight_converts_offset_to_utc() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            local_midnight(day, &plus_two),
            Utc.with_ymd_and_hms(2026, 3, 1, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn overwrite_keeps_previous_image_when_render_failed() {
        let now = Utc::now();
        let mut stored = CanonicalCoupon {
            id: 1,
            public_id: Uuid::new_v4(),
            brand_name: "Acme".to_string(),
            coupon_code: Some("SAVE10".to_string()),
            coupon_title: "Old".to_string(),
            description: Some("old".to_string()),
            terms_and_conditions: None,
            detail_link: None,
            expire_by: None,
            owner_tag: Some(OWNER_TAG.to_string()),
            source_name: Some("test".to_string()),
            rendered_image: Some("b64".to_string()),
            created_at: now,
            updated_at: now,
        };
        let incoming = NewCoupon {
            draft: CouponDraft {
                description: Some("new".to_string()),
                ..draft(Some("SAVE10"), "New", None)
            },
            owner_tag: Some(OWNER_TAG.to_string()),
            rendered_image: None,
        };
        stored.overwrite_from(&incoming);
        assert_eq!(stored.coupon_title, "New");
        assert_eq!(stored.description.as_deref(), Some("new"));
        assert_eq!(stored.rendered_image.as_deref(), Some("b64"));
        assert!(stored.is_machine_authored());
    }

    #[test]
    fn raw_offer_label_falls_back_to_code() {
        let raw = RawOffer {
            brand_name: Some("Acme".to_string()),
            code: Some("SAVE10".to_string()),
            ..RawOffer::default()
        };
        assert_eq!(raw.label(), "Acme / SAVE10");
    }
}
