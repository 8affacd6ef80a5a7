//! Deterministic text cleanup shared by adapters.
//!
//! Used whenever the field-segregation helper is absent or fails, and always
//! as the last pass over whatever the helper returned.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use cpdb_core::{local_midnight, CouponDraft};
use regex::Regex;

use crate::adapter::NormalizeContext;
use crate::error::ScraperError;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex")
});

static EXPIRY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:offer\s+)?(?:expires?|expiring|expiry(?:\s+date)?|valid\s+(?:till|until|thru|through|to)|ends?|ending|exp\.?)\s*(?:on|:)?\s*",
    )
    .expect("valid expiry prefix regex")
});

static IN_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bin\s+(\d{1,3})\s+days?\b").expect("valid relative expiry regex")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid iso date regex"));

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").expect("valid numeric date regex")
});

/// Codes shown by listing sites when there is nothing to copy.
const PLACEHOLDER_CODES: &[&str] = &[
    "NO CODE",
    "NO CODE NEEDED",
    "NO CODE REQUIRED",
    "GET DEAL",
    "SHOW CODE",
    "GET CODE",
    "COPY",
    "COPY CODE",
    "DEAL",
    "N/A",
];

const MAX_FALLBACK_TITLE_CHARS: usize = 120;

const TEXT_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d-%b-%Y",
];

/// Strip HTML tags and collapse whitespace.
#[must_use]
pub fn clean_text(input: &str) -> String {
    let no_tags = TAGS.replace_all(input, " ");
    no_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`clean_text`], mapping empty results to `None`.
#[must_use]
pub fn clean_optional(input: Option<&str>) -> Option<String> {
    input.map(clean_text).filter(|s| !s.is_empty())
}

/// Uppercase, whitespace-free coupon code, or `None` for blanks and
/// placeholders like "Get Deal".
#[must_use]
pub fn normalize_code(input: &str) -> Option<String> {
    let cleaned = clean_text(input).to_uppercase();
    if cleaned.is_empty() || PLACEHOLDER_CODES.contains(&cleaned.as_str()) {
        return None;
    }
    let code: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();
    Some(code)
}

/// Parse free-form expiry text relative to `today`.
///
/// Handles "Expires today", "Ends tomorrow", "Ends in 3 days", ISO dates,
/// US numeric dates (`MM/DD/YYYY`), and English month-name dates.
#[must_use]
pub fn parse_expiry_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = clean_text(text);
    let lower = cleaned.to_lowercase();

    if lower.contains("today") {
        return Some(today);
    }
    if lower.contains("tomorrow") {
        return Some(today + Duration::days(1));
    }
    if let Some(caps) = IN_DAYS.captures(&lower) {
        let days: i64 = caps[1].parse().ok()?;
        return Some(today + Duration::days(days));
    }
    if let Some(caps) = ISO_DATE.captures(&cleaned) {
        return NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok();
    }
    if let Some(caps) = NUMERIC_DATE.captures(&cleaned) {
        return NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y").ok();
    }

    let stripped = EXPIRY_PREFIX.replace(&cleaned, "");
    let stripped = ORDINAL.replace_all(&stripped, "$1");
    let candidate = stripped.trim().trim_end_matches('.');
    TEXT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// Truncate to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate_chars(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

/// Clean each line of a terms block, dropping blank lines.
#[must_use]
pub fn clean_terms(input: &str) -> Option<String> {
    let joined = input
        .lines()
        .map(clean_text)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!joined.is_empty()).then_some(joined)
}

/// Offer fields gathered from the listing, the detail page, and optionally
/// the segregation helper, before the deterministic pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferFields {
    pub title: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub expiry_text: Option<String>,
    pub link: Option<String>,
}

/// Deterministic pass producing a [`CouponDraft`].
///
/// The title falls back to the description and then the code; an offer with
/// none of them is rejected.
///
/// # Errors
///
/// Returns [`ScraperError::Normalization`] when no title can be formed.
pub fn assemble_draft(
    source_name: &str,
    brand_name: &str,
    fields: OfferFields,
    ctx: &NormalizeContext<'_>,
) -> Result<CouponDraft, ScraperError> {
    let coupon_code = fields.code.as_deref().and_then(normalize_code);
    let description = clean_optional(fields.description.as_deref());

    let coupon_title = clean_optional(fields.title.as_deref())
        .or_else(|| description.as_deref().map(|d| truncate_chars(d, MAX_FALLBACK_TITLE_CHARS)))
        .or_else(|| coupon_code.clone())
        .ok_or_else(|| ScraperError::Normalization {
            label: format!("{brand_name} / <untitled>"),
            reason: "offer has neither title nor code".to_string(),
        })?;

    let expire_by = fields
        .expiry_text
        .as_deref()
        .and_then(|text| parse_expiry_date(text, ctx.today))
        .map(|day| local_midnight(day, &ctx.tz));

    Ok(CouponDraft {
        source_name: source_name.to_string(),
        brand_name: clean_text(brand_name),
        coupon_code,
        coupon_title,
        description,
        terms_and_conditions: fields.terms.as_deref().and_then(clean_terms),
        detail_link: fields.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        expire_by,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
