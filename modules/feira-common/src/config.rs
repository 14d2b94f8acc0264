use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::catalog::CategoryCatalog;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 5000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: String,

    // Interpreter. No key means every search takes the fallback path.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub search_timeout: Duration,
    pub categories: CategoryCatalog,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} environment variable is required"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: optional("JWT_ISSUER").unwrap_or_else(|| "feira".to_string()),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: optional("OPENAI_BASE_URL"),
            search_timeout: Duration::from_millis(
                optional("SEARCH_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SEARCH_TIMEOUT_MS),
            ),
            categories: optional("SEARCH_CATEGORIES")
                .map(|v| CategoryCatalog::new(v.split(',')))
                .filter(|c| !c.names().is_empty())
                .unwrap_or_default(),
            web_host: optional("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: optional("WEB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            allowed_origins: optional("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn interpreter_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/feira"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert!(!config.interpreter_enabled());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.search_timeout, Duration::from_millis(5000));
        assert_eq!(config.categories, CategoryCatalog::default());
        assert_eq!(config.web_port, 3001);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn blank_api_key_counts_as_absent() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("OPENAI_API_KEY", "   "),
        ]))
        .unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("OPENAI_API_KEY", "sk-1"),
            ("SEARCH_TIMEOUT_MS", "250"),
            ("SEARCH_CATEGORIES", "Livros, Doces"),
            ("WEB_PORT", "not-a-port"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test"),
        ]))
        .unwrap();

        assert!(config.interpreter_enabled());
        assert_eq!(config.search_timeout, Duration::from_millis(250));
        assert_eq!(config.categories.names(), ["Livros".to_string(), "Doces".to_string()]);
        assert_eq!(config.web_port, 3001);
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }
}
