//! Wiring shared by `run`, `purge` and `schedule`.

use std::sync::Arc;

use cpdb_browser::{BrowserManager, BrowserSettings};
use cpdb_core::AppConfig;
use cpdb_db::{CouponStore, DbError, MemoryCouponStore, PgCouponStore, PoolConfig};
use cpdb_ingest::{CardRenderer, EngineSettings, IngestionEngine};
use cpdb_scraper::{build_adapters, ListingClient, OpenAiSegregator, SourceAdapter};
use sqlx::PgPool;

/// Connect to Postgres using `DATABASE_URL` and the pool settings.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(DbError::MissingDatabaseUrl)?;
    let pool = cpdb_db::connect_pool(url, PoolConfig::from_app_config(config)).await?;
    Ok(pool)
}

/// Postgres store with migrations applied, or a throwaway memory store for dry runs.
pub(crate) async fn open_store(
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<Arc<dyn CouponStore>> {
    if dry_run {
        tracing::info!("dry run: reconciling against an in-memory store");
        return Ok(Arc::new(MemoryCouponStore::new()));
    }
    let pool = connect(config).await?;
    cpdb_db::run_migrations(&pool).await?;
    Ok(Arc::new(PgCouponStore::new(pool)))
}

/// Engine plus the adapters it drives. Owns the browser so it can be closed
/// once the process is done with it.
pub(crate) struct Pipeline {
    pub engine: IngestionEngine,
    pub adapters: Vec<Box<dyn SourceAdapter>>,
    browser: Option<Arc<BrowserManager>>,
}

impl Pipeline {
    /// Build adapters from the sources file and attach the optional
    /// collaborators the configuration enables.
    pub(crate) fn build(
        config: &AppConfig,
        store: Arc<dyn CouponStore>,
        filter: Option<&[String]>,
    ) -> anyhow::Result<Self> {
        let sources = cpdb_core::load_sources(&config.sources_path)?;
        let client = ListingClient::from_app_config(config)?;
        let adapters = build_adapters(&sources, filter, &client);
        if adapters.is_empty() {
            tracing::warn!(path = %config.sources_path.display(), "no active sources to scrape");
        }

        let mut engine = IngestionEngine::new(store, EngineSettings::from_app_config(config))
            .with_renderer(Arc::new(CardRenderer::new()));

        let browser = if config.browser_enabled {
            let manager = Arc::new(BrowserManager::new(BrowserSettings::from_app_config(config)));
            engine = engine.with_details(manager.clone());
            Some(manager)
        } else {
            tracing::info!("browser disabled; detail pages will not be visited");
            None
        };

        if let Some(segregator) = OpenAiSegregator::from_app_config(config)? {
            tracing::info!(model = %config.segregation_model, "field segregation enabled");
            engine = engine.with_segregator(Arc::new(segregator));
        }

        Ok(Self {
            engine,
            adapters,
            browser,
        })
    }

    /// Close the browser if one was launched. Safe to call more than once.
    pub(crate) async fn shutdown(&self) {
        if let Some(browser) = &self.browser {
            browser.shutdown().await;
        }
    }
}

/// `--source` flags win over `CPDB_ACTIVE_SOURCES`.
pub(crate) fn source_filter(config: &AppConfig, requested: Vec<String>) -> Option<Vec<String>> {
    if requested.is_empty() {
        config.active_sources.clone()
    } else {
        Some(requested)
    }
}
