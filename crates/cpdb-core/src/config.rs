use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_flag = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_bool(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no/on/off".to_string(),
            )
        })
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("CPDB_ENV", "development"))?;
    let log_level = or_default("CPDB_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("CPDB_SOURCES_PATH", "./config/sources.yaml"));
    let active_sources = optional("CPDB_ACTIVE_SOURCES").map(|raw| parse_name_list(&raw));

    let db_max_connections = parse_u32("CPDB_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("CPDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CPDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("CPDB_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default(
        "CPDB_SCRAPER_USER_AGENT",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    );
    let scraper_max_retries = parse_u32("CPDB_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs = parse_u64("CPDB_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;
    let inter_source_delay_ms = parse_u64("CPDB_INTER_SOURCE_DELAY_MS", "2000")?;

    let browser_enabled = parse_flag("CPDB_BROWSER_ENABLED", "true")?;
    let browser_executable = optional("CPDB_BROWSER_EXECUTABLE").map(PathBuf::from);
    let browser_nav_timeout_secs = parse_u64("CPDB_BROWSER_NAV_TIMEOUT_SECS", "30")?;
    let browser_settle_ms = parse_u64("CPDB_BROWSER_SETTLE_MS", "3000")?;

    let segregation_enabled = parse_flag("CPDB_SEGREGATION_ENABLED", "false")?;
    let openai_api_key = optional("OPENAI_API_KEY");
    let segregation_model = or_default("CPDB_SEGREGATION_MODEL", "gpt-4o-mini");
    let segregation_base_url = or_default("CPDB_SEGREGATION_BASE_URL", "https://api.openai.com");
    let segregation_timeout_secs = parse_u64("CPDB_SEGREGATION_TIMEOUT_SECS", "20")?;
    if segregation_timeout_secs == 0 {
        return Err(invalid(
            "CPDB_SEGREGATION_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }

    let store_max_attempts = parse_u32("CPDB_STORE_MAX_ATTEMPTS", "3")?;
    if store_max_attempts == 0 {
        return Err(invalid(
            "CPDB_STORE_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let store_backoff_base_ms = parse_u64("CPDB_STORE_BACKOFF_BASE_MS", "500")?;

    let ingest_cron = or_default("CPDB_INGEST_CRON", "0 0 3 * * *");
    let purge_cron = or_default("CPDB_PURGE_CRON", "0 30 0 * * *");

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        active_sources,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        inter_source_delay_ms,
        browser_enabled,
        browser_executable,
        browser_nav_timeout_secs,
        browser_settle_ms,
        segregation_enabled,
        openai_api_key,
        segregation_model,
        segregation_base_url,
        segregation_timeout_secs,
        store_max_attempts,
        store_backoff_base_ms,
        ingest_cron,
        purge_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CPDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
