use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database. `None` runs against in-memory stores.
    pub database_url: Option<String>,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: String,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    // Counter advance
    pub cas_max_attempts: usize,
    pub cas_base_delay_ms: u64,
    pub cas_max_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET environment variable is required")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "likely".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parse_env("API_PORT", 3000)?,
            cas_max_attempts: parse_env("CAS_MAX_ATTEMPTS", 64)?,
            cas_base_delay_ms: parse_env("CAS_BASE_DELAY_MS", 1)?,
            cas_max_delay_ms: parse_env("CAS_MAX_DELAY_MS", 50)?,
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!(
            "  DATABASE_URL: {}",
            self.database_url
                .as_deref()
                .map(preview)
                .unwrap_or_else(|| "<not set, using in-memory stores>".to_string())
        );
        tracing::info!("  JWT_SECRET: {}", preview(&self.jwt_secret));
        tracing::info!("  JWT_ISSUER: {}", self.jwt_issuer);
        tracing::info!(
            "  CAS: max_attempts={} base_delay_ms={} max_delay_ms={}",
            self.cas_max_attempts,
            self.cas_base_delay_ms,
            self.cas_max_delay_ms
        );
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
