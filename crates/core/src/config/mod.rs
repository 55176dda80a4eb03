//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFCACHE_*)
//! 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The cache version is deliberately part of the configuration rather than
//! a module-level constant: every worker resolves it once at startup, and
//! tests can run several versions side by side in one process.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheNamespace;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFCACHE_*)
/// 2. TOML config file (if OFFCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identifier used as the namespace prefix.
    ///
    /// Set via OFFCACHE_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Current cache generation. Changing this string on deploy is the
    /// only supported way to force cache invalidation.
    ///
    /// Set via OFFCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via OFFCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application whose requests are intercepted,
    /// e.g. "https://app.example.com".
    ///
    /// Set via OFFCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Cross-origin hosts treated as the application's data backend,
    /// matched by hostname substring.
    ///
    /// Set via OFFCACHE_API_HOSTS environment variable (comma-separated).
    #[serde(default)]
    pub api_hosts: Vec<String>,

    /// Path prefix identifying same-origin data/API requests.
    ///
    /// Set via OFFCACHE_API_PATH_PREFIX environment variable.
    #[serde(default = "default_api_path_prefix")]
    pub api_path_prefix: String,

    /// Path prefix identifying static-asset/media requests.
    ///
    /// Set via OFFCACHE_STATIC_PATH_PREFIX environment variable.
    #[serde(default = "default_static_path_prefix")]
    pub static_path_prefix: String,

    /// Absolute paths pre-populated into the namespace at install time
    /// (document shell, core bundles, icons, manifest).
    ///
    /// Set via OFFCACHE_PRECACHE environment variable (comma-separated).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path of the static document served when a navigation fails with
    /// no network and no cached entry.
    ///
    /// Set via OFFCACHE_OFFLINE_DOCUMENT environment variable.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// User-Agent string for upstream HTTP requests.
    ///
    /// Set via OFFCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_app_name() -> String {
    "offcache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offcache.sqlite")
}

fn default_origin() -> String {
    "https://localhost".into()
}

fn default_api_path_prefix() -> String {
    "/api/".into()
}

fn default_static_path_prefix() -> String {
    "/static/".into()
}

fn default_precache() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "/offline.html".into(),
        "/manifest.json".into(),
    ]
}

fn default_offline_document() -> String {
    "/offline.html".into()
}

fn default_user_agent() -> String {
    "offcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            origin: default_origin(),
            api_hosts: Vec::new(),
            api_path_prefix: default_api_path_prefix(),
            static_path_prefix: default_static_path_prefix(),
            precache: default_precache(),
            offline_document: default_offline_document(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Namespace owned by the configured cache version.
    pub fn namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.app_name, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFCACHE_`
    /// 2. TOML file from `OFFCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.app_name, "offcache");
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.db_path, PathBuf::from("./offcache.sqlite"));
        assert_eq!(config.api_path_prefix, "/api/");
        assert_eq!(config.static_path_prefix, "/static/");
        assert_eq!(config.offline_document, "/offline.html");
        assert!(config.precache.contains(&"/index.html".to_string()));
        assert!(config.api_hosts.is_empty());
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_namespace_follows_version() {
        let config = AppConfig { cache_version: "2024-10-03".into(), ..Default::default() };
        assert_eq!(config.namespace().as_str(), "offcache-2024-10-03");
    }

    #[test]
    fn test_two_versions_in_one_process() {
        let v1 = AppConfig { cache_version: "v1".into(), ..Default::default() };
        let v2 = AppConfig { cache_version: "v2".into(), ..Default::default() };
        assert_ne!(v1.namespace(), v2.namespace());
    }
}
