//! Source (adapter) configuration loaded from `sources.yaml`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Static listing pages parsed with CSS selectors, optionally followed by
    /// JS-rendered detail pages.
    ListingPage,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::ListingPage => write!(f, "listing_page"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_href() -> String {
    "href".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Brand applied to every offer when the listing carries no brand element.
    pub brand_name: Option<String>,
    pub listing_urls: Vec<String>,
    pub selectors: ListingSelectors,
    #[serde(default)]
    pub detail: Option<DetailConfig>,
}

/// CSS selectors for one listing page. All but `item` are evaluated relative
/// to the matched item element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    pub item: String,
    pub title: Option<String>,
    pub code: Option<String>,
    /// Attribute holding the code when it is not in the element text
    /// (e.g. `data-code`).
    pub code_attribute: Option<String>,
    pub brand: Option<String>,
    pub link: Option<String>,
    #[serde(default = "default_href")]
    pub link_attribute: String,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub expiry: Option<String>,
}

/// Detail-page extraction settings. Selectors left unset use the built-in
/// coupon heuristics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub nav_timeout_secs: Option<u64>,
    pub settle_ms: Option<u64>,
    pub code_selector: Option<String>,
    pub clipboard_attribute: Option<String>,
    pub title_selector: Option<String>,
    pub description_selector: Option<String>,
    pub terms_selector: Option<String>,
    #[serde(default)]
    pub extra_denylist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Enabled sources in configuration order, optionally restricted to `filter`.
    #[must_use]
    pub fn active<'a>(&'a self, filter: Option<&[String]>) -> Vec<&'a SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| filter.is_none_or(|names| names.iter().any(|n| n == &s.name)))
            .collect()
    }
}

/// Load and validate the sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile = serde_yaml::from_str(content)?;
    validate_sources(&sources_file)?;
    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }

        if source.listing_urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has no listing_urls",
                source.name
            )));
        }

        if source.selectors.item.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty item selector",
                source.name
            )));
        }

        if source.selectors.title.is_none() && source.selectors.code.is_none() {
            return Err(ConfigError::Validation(format!(
                "source '{}' needs at least a title or code selector",
                source.name
            )));
        }
    }

    Ok(())
}
