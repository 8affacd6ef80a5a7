pub mod adapter;
pub mod client;
pub mod detail;
pub mod error;
pub mod listing;
pub mod normalize;
pub mod registry;
mod retry;
pub mod segregation;

pub use adapter::{NormalizeContext, OfferStream, SourceAdapter};
pub use client::ListingClient;
pub use detail::CouponDetailRules;
pub use error::ScraperError;
pub use listing::ListingPageAdapter;
pub use registry::build_adapters;
pub use segregation::{FieldSegregator, OpenAiSegregator, SegregatedFields, SegregationError};
