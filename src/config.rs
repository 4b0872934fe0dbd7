use crate::i18n::LanguageRegistry;
use anyhow::{Context, Result};

/// `DATABASE_URL` value selecting the in-memory store
pub const IN_MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    pub database_max_connections: u32,

    // Server
    pub port: u16,

    // Translation maintenance is restricted to holders of this key
    pub admin_api_key: String,

    // Language negotiation
    pub default_language: Option<String>,
    pub language_query_param: String,
    pub language_cookie_name: String,
    pub language_header: String,
    pub language_cookie_max_age_days: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Storage
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,

            // Server
            port: parse_or("PORT", 8080)?,

            admin_api_key: std::env::var("ADMIN_API_KEY")
                .context("ADMIN_API_KEY not set")
                .and_then(|key| {
                    let key = key.trim().to_string();
                    anyhow::ensure!(!key.is_empty(), "ADMIN_API_KEY is empty");
                    Ok(key)
                })?,

            // Language negotiation
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            language_query_param: std::env::var("LANGUAGE_QUERY_PARAM")
                .unwrap_or_else(|_| "lang".to_string()),
            language_cookie_name: std::env::var("LANGUAGE_COOKIE_NAME")
                .unwrap_or_else(|_| "lang".to_string()),
            language_header: std::env::var("LANGUAGE_HEADER")
                .map(|v| v.to_ascii_lowercase())
                .unwrap_or_else(|_| "x-language".to_string()),
            language_cookie_max_age_days: parse_or("LANGUAGE_COOKIE_MAX_AGE_DAYS", 365)?,
        };

        // Fail at startup rather than on the first request
        config.registry()?;
        axum::http::HeaderName::from_bytes(config.language_header.as_bytes())
            .context("LANGUAGE_HEADER is not a valid header name")?;

        Ok(config)
    }

    /// The language registry for this deployment.
    pub fn registry(&self) -> Result<LanguageRegistry> {
        let builtin = LanguageRegistry::get();
        match &self.default_language {
            Some(code) => builtin.with_default(code).with_context(|| {
                let supported: Vec<_> = builtin.codes().collect();
                format!("DEFAULT_LANGUAGE must be one of {:?}", supported)
            }),
            None => Ok(builtin.clone()),
        }
    }

    pub fn uses_in_memory_store(&self) -> bool {
        self.database_url == IN_MEMORY_DATABASE_URL
    }

    pub fn language_cookie_max_age_secs(&self) -> u64 {
        u64::from(self.language_cookie_max_age_days) * 24 * 60 * 60
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
