//! Coupon card rendering.
//!
//! The engine treats rendering as a pure function from display fields to
//! encoded image bytes. A failure only means "no new image" for that record.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use cpdb_core::CouponDraft;
use image::{ImageFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("coupon has no title to render")]
    MissingTitle,

    #[error("failed to encode card image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Display-ready subset of a coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    pub brand_name: String,
    pub title: String,
    pub code: Option<String>,
    pub expire_by: Option<DateTime<Utc>>,
}

impl From<&CouponDraft> for DisplayFields {
    fn from(draft: &CouponDraft) -> Self {
        Self {
            brand_name: draft.brand_name.clone(),
            title: draft.coupon_title.clone(),
            code: draft.coupon_code.clone(),
            expire_by: draft.expire_by,
        }
    }
}

pub trait ImageRenderer: Send + Sync {
    /// Encode a shareable image for `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when no image can be produced.
    fn render(&self, fields: &DisplayFields) -> Result<Vec<u8>, RenderError>;
}

const CARD_WIDTH: u32 = 600;
const CARD_HEIGHT: u32 = 300;
const HEADER_HEIGHT: u32 = 72;
const BORDER: u32 = 6;
const STRIPE_TOP: u32 = 200;
const STRIPE_HEIGHT: u32 = 48;
const STRIPE_MARGIN: u32 = 40;

const BACKGROUND: Rgba<u8> = Rgba([250, 250, 247, 255]);
const INK: Rgba<u8> = Rgba([32, 32, 32, 255]);

/// Draws a PNG card: brand-coloured header and border, plus a fingerprint
/// stripe derived from the code (or title for code-less deals).
///
/// Colours and stripe are a pure function of the input, so re-rendering an
/// unchanged coupon yields identical bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardRenderer;

impl CardRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Header colour for `brand_name`. Channels are kept in the mid range so
    /// the card stays readable on both light and dark backgrounds.
    #[must_use]
    pub fn brand_colour(brand_name: &str) -> Rgba<u8> {
        let digest = Sha256::digest(brand_name.trim().to_lowercase().as_bytes());
        Rgba([
            digest[0] / 2 + 48,
            digest[1] / 2 + 48,
            digest[2] / 2 + 48,
            255,
        ])
    }

    fn fingerprint(fields: &DisplayFields) -> [u8; 32] {
        let seed = fields.code.as_deref().unwrap_or(&fields.title);
        Sha256::digest(seed.as_bytes()).into()
    }
}

impl ImageRenderer for CardRenderer {
    fn render(&self, fields: &DisplayFields) -> Result<Vec<u8>, RenderError> {
        if fields.title.trim().is_empty() {
            return Err(RenderError::MissingTitle);
        }

        let colour = Self::brand_colour(&fields.brand_name);
        let mut card = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, BACKGROUND);

        for (x, y, pixel) in card.enumerate_pixels_mut() {
            let on_border = x < BORDER
                || y < BORDER
                || x >= CARD_WIDTH - BORDER
                || y >= CARD_HEIGHT - BORDER;
            if on_border || y < HEADER_HEIGHT {
                *pixel = colour;
            }
        }

        // 256 bars across the stripe, one per fingerprint bit.
        let bits = Self::fingerprint(fields);
        let stripe_width = CARD_WIDTH - 2 * STRIPE_MARGIN;
        for x in 0..stripe_width {
            let bit = (x * 256 / stripe_width) as usize;
            if bits[bit / 8] & (1 << (bit % 8)) == 0 {
                continue;
            }
            for y in STRIPE_TOP..STRIPE_TOP + STRIPE_HEIGHT {
                card.put_pixel(STRIPE_MARGIN + x, y, INK);
            }
        }

        let mut bytes = Cursor::new(Vec::new());
        card.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
}
