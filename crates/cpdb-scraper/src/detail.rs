//! Detail-page extraction rules run over a rendered DOM snapshot.

use std::sync::LazyLock;
use std::time::Duration;

use cpdb_browser::{DetailRecord, DomExtractor};
use cpdb_core::DetailConfig;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::normalize::{clean_text, normalize_code};

pub const MIN_TERM_CHARS: usize = 20;
pub const MAX_TERM_CHARS: usize = 300;
pub const MAX_TERMS: usize = 10;

const DEFAULT_CODE_SELECTOR: &str =
    ".coupon-code, .copy-code, [data-coupon-code], [data-clipboard-text], .promo-code, .code";
const DEFAULT_TITLE_SELECTOR: &str = "h1";
const DEFAULT_DESCRIPTION_SELECTOR: &str = ".coupon-description, .offer-description, .description";
const META_DESCRIPTION_SELECTOR: &str = "meta[name=description]";
const DEFAULT_TERMS_SELECTOR: &str =
    ".terms li, .terms p, .terms-and-conditions li, .terms-and-conditions p, [class*=terms] li";
const FALLBACK_TERMS_SELECTOR: &str = "li";

/// Attributes copy buttons commonly put the real code in.
const CLIPBOARD_ATTRIBUTES: &[&str] = &[
    "data-clipboard-text",
    "data-code",
    "data-coupon-code",
    "data-coupon",
    "data-promo",
];

/// Lines that are site chrome, never coupon terms.
const BOILERPLATE: &[&str] = &[
    "cookie",
    "privacy policy",
    "terms of use",
    "all rights reserved",
    "newsletter",
    "subscribe",
    "sign up",
    "sign in",
    "log in",
    "download our app",
    "follow us",
    "javascript",
    "copyright",
];

static EXPIRY_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:expires?|expiry date|valid (?:till|until|thru|through)|ends)\b\s*(?:on|:)?\s*[^.\n|]{3,40}",
    )
    .expect("valid detail expiry regex")
});

/// `[attr], [attr], ...` over the configured attribute and the common ones.
fn clipboard_selector(configured: Option<&str>) -> String {
    configured
        .into_iter()
        .chain(CLIPBOARD_ATTRIBUTES.iter().copied())
        .map(|attr| format!("[{attr}]"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn compile(source_name: &str, css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
        source_name: source_name.to_string(),
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Coupon detail heuristics: copy-code element with a clipboard-attribute
/// fallback, title and description, term lines filtered against a
/// boilerplate denylist, and expiry text.
#[derive(Debug)]
pub struct CouponDetailRules {
    code: Selector,
    clipboard_attribute: Option<String>,
    clipboard: Selector,
    title: Selector,
    description: Selector,
    meta_description: Selector,
    terms: Selector,
    fallback_terms: Selector,
    denylist: Vec<String>,
    nav_timeout: Option<Duration>,
    settle: Option<Duration>,
}

impl CouponDetailRules {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if a configured selector
    /// does not parse.
    pub fn from_config(source_name: &str, config: &DetailConfig) -> Result<Self, ScraperError> {
        let pick = |configured: Option<&String>, default: &str| {
            compile(source_name, configured.map_or(default, String::as_str))
        };

        let mut denylist: Vec<String> = BOILERPLATE.iter().map(|s| (*s).to_string()).collect();
        denylist.extend(config.extra_denylist.iter().map(|s| s.to_lowercase()));

        Ok(Self {
            code: pick(config.code_selector.as_ref(), DEFAULT_CODE_SELECTOR)?,
            clipboard_attribute: config.clipboard_attribute.clone(),
            clipboard: compile(
                source_name,
                &clipboard_selector(config.clipboard_attribute.as_deref()),
            )?,
            title: pick(config.title_selector.as_ref(), DEFAULT_TITLE_SELECTOR)?,
            description: pick(
                config.description_selector.as_ref(),
                DEFAULT_DESCRIPTION_SELECTOR,
            )?,
            meta_description: compile(source_name, META_DESCRIPTION_SELECTOR)?,
            terms: pick(config.terms_selector.as_ref(), DEFAULT_TERMS_SELECTOR)?,
            fallback_terms: compile(source_name, FALLBACK_TERMS_SELECTOR)?,
            denylist,
            nav_timeout: config.nav_timeout_secs.map(Duration::from_secs),
            settle: config.settle_ms.map(Duration::from_millis),
        })
    }

    fn clipboard_attributes(&self) -> impl Iterator<Item = &str> {
        self.clipboard_attribute
            .as_deref()
            .into_iter()
            .chain(CLIPBOARD_ATTRIBUTES.iter().copied())
    }

    fn code_from_attributes(&self, el: &ElementRef<'_>) -> Option<String> {
        self.clipboard_attributes()
            .find_map(|attr| el.value().attr(attr).and_then(normalize_code))
    }

    fn extract_code(&self, doc: &Html) -> Option<String> {
        for el in doc.select(&self.code) {
            if let Some(code) = normalize_code(&element_text(&el)) {
                return Some(code);
            }
            // The visible text is often "Copy" or masked; the real code sits in
            // an attribute the clipboard script reads.
            if let Some(code) = self.code_from_attributes(&el) {
                return Some(code);
            }
        }
        doc.select(&self.clipboard)
            .find_map(|el| self.code_from_attributes(&el))
    }

    fn extract_description(&self, doc: &Html) -> Option<String> {
        doc.select(&self.description)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
            .or_else(|| {
                doc.select(&self.meta_description)
                    .filter_map(|el| el.value().attr("content").map(clean_text))
                    .find(|t| !t.is_empty())
            })
    }

    fn is_term_line(&self, line: &str) -> bool {
        let len = line.chars().count();
        if !(MIN_TERM_CHARS..=MAX_TERM_CHARS).contains(&len) {
            return false;
        }
        let lower = line.to_lowercase();
        !self.denylist.iter().any(|deny| lower.contains(deny.as_str()))
    }

    fn extract_terms(&self, doc: &Html) -> Vec<String> {
        let mut terms = self.collect_terms(doc, &self.terms);
        if terms.is_empty() {
            terms = self.collect_terms(doc, &self.fallback_terms);
        }
        terms
    }

    fn collect_terms(&self, doc: &Html, selector: &Selector) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for el in doc.select(selector) {
            let line = element_text(&el);
            if self.is_term_line(&line) && !terms.contains(&line) {
                terms.push(line);
                if terms.len() == MAX_TERMS {
                    break;
                }
            }
        }
        terms
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn body_text(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join("\n")
}

impl DomExtractor for CouponDetailRules {
    fn extract(&self, html: &str, _url: &str) -> DetailRecord {
        let doc = Html::parse_document(html);

        let title = doc
            .select(&self.title)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty());

        let expiry_text = EXPIRY_TEXT
            .find(&body_text(&doc))
            .map(|m| clean_text(m.as_str()));

        DetailRecord {
            code: self.extract_code(&doc),
            title,
            description: self.extract_description(&doc),
            terms: self.extract_terms(&doc),
            expiry_text,
        }
    }

    fn nav_timeout(&self) -> Option<Duration> {
        self.nav_timeout
    }

    fn settle(&self) -> Option<Duration> {
        self.settle
    }
}

#[cfg(test)]
#[path = "detail_test.rs"]
mod tests;
