//! Shared domain types and configuration for the cpdb coupon pipeline.

pub mod app_config;
pub mod config;
pub mod coupons;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use coupons::{
    day_range, local_midnight, CanonicalCoupon, CouponDraft, CouponIdentity, IdentityKey,
    NewCoupon, RawOffer, OWNER_TAG,
};
pub use sources::{
    load_sources, DetailConfig, ListingSelectors, SourceConfig, SourceKind, SourcesFile,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
