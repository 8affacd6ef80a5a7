use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, Page};
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{resolve_executable, BrowserError, DetailExtractor, DetailRecord, DomExtractor};

const HEADLESS_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-sync",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
];

/// Upper bound on reading the DOM once navigation has settled.
const CONTENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub nav_timeout: Duration,
    pub settle: Duration,
}

impl BrowserSettings {
    #[must_use]
    pub fn from_app_config(config: &cpdb_core::AppConfig) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            user_agent: config.scraper_user_agent.clone(),
            nav_timeout: Duration::from_secs(config.browser_nav_timeout_secs),
            settle: Duration::from_millis(config.browser_settle_ms),
        }
    }
}

struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Owns the process-wide headless browser.
pub struct BrowserManager {
    settings: BrowserSettings,
    state: Mutex<Option<LaunchedBrowser>>,
    open_pages: AtomicUsize,
}

impl BrowserManager {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(None),
            open_pages: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Launch the browser if it is not running yet.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] when no executable is found or the
    /// process fails to start.
    pub async fn initialize(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(());
        }

        let exe = resolve_executable(self.settings.executable.as_deref())?;
        let config = BrowserConfig::builder()
            .chrome_executable(&exe)
            .args(HEADLESS_ARGS.iter().copied())
            .build()
            .map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(format!("{} ({e})", exe.display())))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler event error");
                }
            }
        });

        tracing::info!(executable = %exe.display(), "headless browser launched");
        *state = Some(LaunchedBrowser { browser, handler });
        Ok(())
    }

    /// A fresh blank page with the configured user agent. Launches the
    /// browser on first use. Release it with [`BrowserManager::close_page`].
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if the browser cannot be launched or the page
    /// cannot be created.
    pub async fn create_page(&self) -> Result<Page, BrowserError> {
        self.initialize().await?;

        let page = {
            let state = self.state.lock().await;
            let launched = state
                .as_ref()
                .ok_or_else(|| BrowserError::Launch("browser shut down".to_string()))?;
            launched.browser.new_page("about:blank").await?
        };
        self.open_pages.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = page
            .execute(SetUserAgentOverrideParams::new(
                self.settings.user_agent.clone(),
            ))
            .await
        {
            self.close_page(page).await;
            return Err(e.into());
        }
        Ok(page)
    }

    pub async fn close_page(&self, page: Page) {
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "page close failed");
        }
        self.open_pages.fetch_sub(1, Ordering::SeqCst);
    }

    /// Pages created and not yet closed.
    #[must_use]
    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }

    /// Navigate, wait for the settle period, and return the rendered HTML.
    async fn render(
        &self,
        page: &Page,
        url: &str,
        nav_timeout: Duration,
        settle: Duration,
    ) -> Result<String, BrowserError> {
        let nav = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| BrowserError::Navigation {
                url: url.to_string(),
                reason,
            })?;

        let response = tokio::time::timeout(nav_timeout, page.execute(nav))
            .await
            .map_err(|_| BrowserError::ExtractionTimeout {
                url: url.to_string(),
                secs: nav_timeout.as_secs(),
            })??;

        if let Some(reason) = response.result.error_text.clone() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        tokio::time::sleep(settle).await;

        let html = tokio::time::timeout(CONTENT_TIMEOUT, page.content())
            .await
            .map_err(|_| BrowserError::ExtractionTimeout {
                url: url.to_string(),
                secs: CONTENT_TIMEOUT.as_secs(),
            })??;
        Ok(html)
    }

    /// Render `url` in its own page and run `extractor` over the DOM.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] on launch, navigation, timeout or CDP failure.
    /// The page is closed in every case.
    pub async fn try_extract_details(
        &self,
        url: &str,
        extractor: &dyn DomExtractor,
    ) -> Result<DetailRecord, BrowserError> {
        let nav_timeout = extractor.nav_timeout().unwrap_or(self.settings.nav_timeout);
        let settle = extractor.settle().unwrap_or(self.settings.settle);

        let page = self.create_page().await?;
        let outcome = AssertUnwindSafe(async {
            let html = self.render(&page, url, nav_timeout, settle).await?;
            Ok::<_, BrowserError>(extractor.extract(&html, url))
        })
        .catch_unwind()
        .await;
        self.close_page(page).await;

        tracing::debug!(url, open_pages = self.open_pages(), "detail page closed");

        outcome.unwrap_or_else(|_| {
            Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "extraction panicked".to_string(),
            })
        })
    }

    /// Close the browser. Safe to call more than once.
    pub async fn shutdown(&self) {
        let Some(mut launched) = self.state.lock().await.take() else {
            return;
        };

        if let Err(e) = launched.browser.close().await {
            tracing::warn!(error = %e, "browser close failed");
        }
        if let Err(e) = launched.browser.wait().await {
            tracing::debug!(error = %e, "browser wait failed");
        }
        launched.handler.abort();
        tracing::info!("headless browser shut down");
    }
}

#[async_trait]
impl DetailExtractor for BrowserManager {
    async fn warm_up(&self) -> Result<(), BrowserError> {
        self.initialize().await
    }

    async fn extract_details(
        &self,
        url: &str,
        extractor: &dyn DomExtractor,
    ) -> Option<DetailRecord> {
        match self.try_extract_details(url, extractor).await {
            Ok(record) => Some(record),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(url, error = %e, "detail page timed out; using listing data");
                None
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "detail extraction failed; using listing data");
                None
            }
        }
    }
}
