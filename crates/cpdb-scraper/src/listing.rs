//! Reference adapter: static listing pages parsed with CSS selectors, with
//! optional JS-rendered detail pages.

use std::collections::VecDeque;

use async_trait::async_trait;
use cpdb_core::{CouponDraft, RawOffer, SourceConfig};
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};

use crate::adapter::{NormalizeContext, OfferStream, SourceAdapter};
use crate::client::ListingClient;
use crate::detail::CouponDetailRules;
use crate::error::ScraperError;
use crate::normalize::{assemble_draft, clean_optional, clean_text, OfferFields};

/// Key under [`RawOffer::extra`] holding the page an offer was listed on.
pub const LISTING_URL_KEY: &str = "listing_url";

#[derive(Debug)]
struct ListingSelectorSet {
    item: Selector,
    title: Option<Selector>,
    code: Option<Selector>,
    code_attribute: Option<String>,
    brand: Option<Selector>,
    link: Option<Selector>,
    link_attribute: String,
    description: Option<Selector>,
    terms: Option<Selector>,
    expiry: Option<Selector>,
}

impl ListingSelectorSet {
    fn compile(source: &SourceConfig) -> Result<Self, ScraperError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
                source_name: source.name.clone(),
                selector: css.to_string(),
                reason: e.to_string(),
            })
        };
        let optional = |css: Option<&String>| css.map(|c| parse(c.as_str())).transpose();

        let s = &source.selectors;
        Ok(Self {
            item: parse(s.item.as_str())?,
            title: optional(s.title.as_ref())?,
            code: optional(s.code.as_ref())?,
            code_attribute: s.code_attribute.clone(),
            brand: optional(s.brand.as_ref())?,
            link: optional(s.link.as_ref())?,
            link_attribute: s.link_attribute.clone(),
            description: optional(s.description.as_ref())?,
            terms: optional(s.terms.as_ref())?,
            expiry: optional(s.expiry.as_ref())?,
        })
    }
}

fn first_text(item: &ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let el = item.select(selector?).next()?;
    let text = el.text().collect::<Vec<_>>().join(" ");
    clean_optional(Some(text.as_str()))
}

fn first_attr(item: &ElementRef<'_>, selector: Option<&Selector>, attr: &str) -> Option<String> {
    let el = item.select(selector?).next()?;
    clean_optional(el.value().attr(attr))
}

fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    reqwest::Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .ok()
}

/// A [`SourceAdapter`] configured entirely from one `sources.yaml` entry.
pub struct ListingPageAdapter {
    source: SourceConfig,
    client: ListingClient,
    selectors: ListingSelectorSet,
    detail: Option<CouponDetailRules>,
}

impl ListingPageAdapter {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if any configured selector
    /// fails to parse.
    pub fn new(source: SourceConfig, client: ListingClient) -> Result<Self, ScraperError> {
        let selectors = ListingSelectorSet::compile(&source)?;
        let detail = match &source.detail {
            Some(cfg) if cfg.enabled => Some(CouponDetailRules::from_config(&source.name, cfg)?),
            _ => None,
        };
        Ok(Self {
            source,
            client,
            selectors,
            detail,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.source
    }

    /// Parse every item on one listing page. Items yielding neither a title
    /// nor a code are dropped.
    #[must_use]
    pub fn parse_listing(&self, html: &str, page_url: &str) -> Vec<RawOffer> {
        let doc = Html::parse_document(html);
        let s = &self.selectors;
        let mut offers = Vec::new();

        for item in doc.select(&s.item) {
            let code = match &s.code_attribute {
                Some(attr) => first_attr(&item, s.code.as_ref(), attr)
                    .or_else(|| first_text(&item, s.code.as_ref())),
                None => first_text(&item, s.code.as_ref()),
            };
            let title = first_text(&item, s.title.as_ref());
            if title.is_none() && code.is_none() {
                continue;
            }

            let link = first_attr(&item, s.link.as_ref(), &s.link_attribute)
                .and_then(|href| resolve_link(page_url, &href));

            let mut extra = serde_json::Map::new();
            extra.insert(
                LISTING_URL_KEY.to_string(),
                serde_json::Value::String(page_url.to_string()),
            );

            offers.push(RawOffer {
                source_name: self.source.name.clone(),
                brand_name: first_text(&item, s.brand.as_ref()),
                title,
                code,
                link,
                description: first_text(&item, s.description.as_ref()),
                terms_text: first_text(&item, s.terms.as_ref()),
                expiry_text: first_text(&item, s.expiry.as_ref()),
                extra,
            });
        }
        offers
    }

    async fn fetch_listing(&self, url: &str) -> Result<Vec<RawOffer>, ScraperError> {
        let html = self.client.fetch_html(url).await?;
        Ok(self.parse_listing(&html, url))
    }

    /// Listing data merged with whatever the detail page revealed.
    async fn gather_fields(&self, raw: RawOffer, ctx: &NormalizeContext<'_>) -> OfferFields {
        let detail = match (&self.detail, ctx.details, raw.link.as_deref()) {
            (Some(rules), Some(details), Some(link)) => details.extract_details(link, rules).await,
            _ => None,
        }
        .unwrap_or_default();

        let terms = if detail.terms.is_empty() {
            raw.terms_text
        } else {
            Some(detail.terms.join("\n"))
        };

        OfferFields {
            title: raw.title.or(detail.title),
            // Listings often mask the code behind a "Show code" button.
            code: detail.code.or(raw.code),
            description: detail.description.or(raw.description),
            terms,
            expiry_text: raw.expiry_text.or(detail.expiry_text),
            link: raw.link,
        }
    }
}

async fn apply_segregation(ctx: &NormalizeContext<'_>, fields: &mut OfferFields, label: &str) {
    let Some(segregator) = ctx.segregator else {
        return;
    };
    let raw_text = [fields.description.as_deref(), fields.terms.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");
    if raw_text.trim().is_empty() {
        return;
    }

    match segregator.segregate(&raw_text).await {
        Ok(seg) => {
            if seg.description.is_some() {
                fields.description = seg.description;
            }
            if seg.terms.is_some() {
                fields.terms = seg.terms;
            }
            if fields.code.is_none() {
                fields.code = seg.code;
            }
            if fields.expiry_text.is_none() {
                fields.expiry_text = seg.expiry;
            }
        }
        Err(e) => {
            tracing::warn!(offer = label, error = %e, "field segregation failed; using deterministic pass");
        }
    }
}

#[async_trait]
impl SourceAdapter for ListingPageAdapter {
    fn source_name(&self) -> &str {
        &self.source.name
    }

    fn wants_details(&self) -> bool {
        self.detail.is_some()
    }

    async fn list_offers(&self) -> Result<OfferStream<'_>, ScraperError> {
        let urls = self.source.listing_urls.clone().into_iter();

        let offers = stream::unfold(
            (urls, VecDeque::new()),
            move |(mut urls, mut pending)| async move {
                if let Some(offer) = pending.pop_front() {
                    return Some((Ok(offer), (urls, pending)));
                }
                loop {
                    let url = urls.next()?;
                    match self.fetch_listing(&url).await {
                        Ok(page) => {
                            tracing::debug!(
                                source = %self.source.name,
                                url = %url,
                                offers = page.len(),
                                "listing page parsed"
                            );
                            pending.extend(page);
                            if let Some(offer) = pending.pop_front() {
                                return Some((Ok(offer), (urls, pending)));
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                source = %self.source.name,
                                url = %url,
                                error = %e,
                                "listing page failed"
                            );
                            return Some((Err(e), (urls, pending)));
                        }
                    }
                }
            },
        );

        Ok(offers.boxed())
    }

    async fn normalize(
        &self,
        raw: RawOffer,
        ctx: &NormalizeContext<'_>,
    ) -> Result<CouponDraft, ScraperError> {
        let label = raw.label();
        let brand = raw
            .brand_name
            .as_deref()
            .map(clean_text)
            .filter(|b| !b.is_empty())
            .or_else(|| self.source.brand_name.clone())
            .ok_or_else(|| ScraperError::Normalization {
                label: label.clone(),
                reason: "no brand on the listing and no brand_name configured".to_string(),
            })?;

        let mut fields = self.gather_fields(raw, ctx).await;
        apply_segregation(ctx, &mut fields, &label).await;
        assemble_draft(&self.source.name, &brand, fields, ctx)
    }
}

#[cfg(test)]
#[path = "listing_test.rs"]
mod tests;
