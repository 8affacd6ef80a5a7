use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

/// HTTP client for static listing pages.
///
/// 404, 429 and other non-2xx responses come back as typed errors; 429s and
/// network failures are retried with exponential backoff.
#[derive(Debug, Clone)]
pub struct ListingClient {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl ListingClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be built.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// # Errors
    ///
    /// See [`ListingClient::new`].
    pub fn from_app_config(config: &cpdb_core::AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.scraper_request_timeout_secs,
            &config.scraper_user_agent,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
        )
    }

    /// Fetch `url` and return the response body as text.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] after retries are exhausted on 429.
    /// - [`ScraperError::NotFound`] on 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`] on any other non-2xx (not retried).
    /// - [`ScraperError::Http`] on network failure after retries are exhausted.
    pub async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ScraperError::RateLimited {
                    url: url.to_string(),
                    retry_after_secs,
                });
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ScraperError::NotFound {
                    url: url.to_string(),
                });
            }

            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }
}
