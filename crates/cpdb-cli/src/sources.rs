use cpdb_core::{AppConfig, SourceConfig};

/// Print every configured source with an active marker.
///
/// # Errors
///
/// Returns an error if the sources file cannot be loaded.
pub(crate) fn list_sources(config: &AppConfig) -> anyhow::Result<()> {
    let file = cpdb_core::load_sources(&config.sources_path)?;
    let active = file.active(config.active_sources.as_deref());

    println!("{}", config.sources_path.display());
    for source in &file.sources {
        let is_active = active.iter().any(|a| a.name == source.name);
        println!("{}", describe(source, is_active));
    }
    Ok(())
}

pub(crate) fn describe(source: &SourceConfig, active: bool) -> String {
    let marker = if active { '*' } else { ' ' };
    let detail = match &source.detail {
        Some(d) if d.enabled => "detail pages",
        _ => "listing only",
    };
    let brand = source.brand_name.as_deref().unwrap_or("per offer");
    format!(
        "{marker} {:<24} {:<13} {} page(s), brand: {brand}, {detail}",
        source.name,
        source.kind.to_string(),
        source.listing_urls.len()
    )
}
