use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Optional so dry runs can work against the in-memory store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    /// Restricts a run to these source names when set (`CPDB_ACTIVE_SOURCES`).
    pub active_sources: Option<Vec<String>>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub inter_source_delay_ms: u64,
    pub browser_enabled: bool,
    pub browser_executable: Option<PathBuf>,
    pub browser_nav_timeout_secs: u64,
    pub browser_settle_ms: u64,
    pub segregation_enabled: bool,
    pub openai_api_key: Option<String>,
    pub segregation_model: String,
    pub segregation_base_url: String,
    /// Whole-request timeout for segregation calls.
    pub segregation_timeout_secs: u64,
    pub store_max_attempts: u32,
    pub store_backoff_base_ms: u64,
    pub ingest_cron: String,
    pub purge_cron: String,
}

impl AppConfig {
    /// The segregation helper is only usable when toggled on and a key exists.
    #[must_use]
    pub fn segregation_available(&self) -> bool {
        self.segregation_enabled && self.openai_api_key.is_some()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("active_sources", &self.active_sources)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("inter_source_delay_ms", &self.inter_source_delay_ms)
            .field("browser_enabled", &self.browser_enabled)
            .field("browser_executable", &self.browser_executable)
            .field("browser_nav_timeout_secs", &self.browser_nav_timeout_secs)
            .field("browser_settle_ms", &self.browser_settle_ms)
            .field("segregation_enabled", &self.segregation_enabled)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("segregation_model", &self.segregation_model)
            .field("segregation_base_url", &self.segregation_base_url)
            .field("segregation_timeout_secs", &self.segregation_timeout_secs)
            .field("store_max_attempts", &self.store_max_attempts)
            .field("store_backoff_base_ms", &self.store_backoff_base_ms)
            .field("ingest_cron", &self.ingest_cron)
            .field("purge_cron", &self.purge_cron)
            .finish()
    }
}
