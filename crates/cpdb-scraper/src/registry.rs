use cpdb_core::{SourceKind, SourcesFile};

use crate::adapter::SourceAdapter;
use crate::client::ListingClient;
use crate::listing::ListingPageAdapter;

/// Build the active adapters in configuration order.
///
/// Disabled sources are skipped. Sources whose selectors do not compile are
/// logged and skipped so one bad entry never blocks the rest.
#[must_use]
pub fn build_adapters(
    sources: &SourcesFile,
    filter: Option<&[String]>,
    client: &ListingClient,
) -> Vec<Box<dyn SourceAdapter>> {
    if let Some(names) = filter {
        for name in names {
            if !sources.sources.iter().any(|s| &s.name == name) {
                tracing::warn!(source = %name, "requested source is not configured");
            }
        }
    }

    let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for source in sources.active(filter) {
        let built = match source.kind {
            SourceKind::ListingPage => ListingPageAdapter::new(source.clone(), client.clone()),
        };
        match built {
            Ok(adapter) => adapters.push(Box::new(adapter)),
            Err(e) => {
                tracing::error!(source = %source.name, error = %e, "invalid source configuration; skipping");
            }
        }
    }
    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpdb_core::{ListingSelectors, SourceConfig};

    fn source(name: &str, item: &str, enabled: bool) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            kind: SourceKind::ListingPage,
            enabled,
            brand_name: None,
            listing_urls: vec![format!("https://{name}.example/")],
            selectors: ListingSelectors {
                item: item.to_string(),
                title: Some("h3".to_string()),
                code: None,
                code_attribute: None,
                brand: None,
                link: None,
                link_attribute: "href".to_string(),
                description: None,
                terms: None,
                expiry: None,
            },
            detail: None,
        }
    }

    fn client() -> ListingClient {
        ListingClient::new(5, "cpdb-test", 0, 0).unwrap()
    }

    #[test]
    fn keeps_configuration_order_and_skips_disabled() {
        let file = SourcesFile {
            sources: vec![
                source("c", ".offer", true),
                source("a", ".offer", false),
                source("b", ".offer", true),
            ],
        };
        let names: Vec<String> = build_adapters(&file, None, &client())
            .iter()
            .map(|a| a.source_name().to_string())
            .collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[test]
    fn skips_sources_with_broken_selectors() {
        let file = SourcesFile {
            sources: vec![source("good", ".offer", true), source("bad", "li[", true)],
        };
        let adapters = build_adapters(&file, None, &client());
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source_name(), "good");
    }

    #[test]
    fn honours_name_filter() {
        let file = SourcesFile {
            sources: vec![source("a", ".offer", true), source("b", ".offer", true)],
        };
        let filter = vec!["b".to_string(), "missing".to_string()];
        let adapters = build_adapters(&file, Some(&filter), &client());
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source_name(), "b");
    }
}
