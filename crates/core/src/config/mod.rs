//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (AEROFISC_SW_*)
//! 2. TOML config file (if AEROFISC_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (AEROFISC_SW_*)
/// 2. TOML config file (if AEROFISC_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite file holding every store.
    ///
    /// Set via AEROFISC_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker is scoped to; requests to any other origin pass through.
    ///
    /// Set via AEROFISC_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Namespace prefix shared by every store this application owns.
    ///
    /// Set via AEROFISC_SW_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag baked into the current store names.
    ///
    /// Set via AEROFISC_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Paths fetched and stored at install time. All or nothing.
    #[serde(default = "default_precache_assets")]
    pub precache_assets: Vec<String>,

    /// Page served for failed top-level navigations. Must be precached.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Path prefixes of live API data: network first, cache only as fallback.
    #[serde(default = "default_network_only_routes")]
    pub network_only_routes: Vec<String>,

    /// Regular expressions matched against `path[?query]`; a match always goes
    /// straight to the network untouched. Defaults describe a Vite dev server.
    #[serde(default = "default_dev_bypass_patterns")]
    pub dev_bypass_patterns: Vec<String>,

    /// User-Agent string for network requests.
    ///
    /// Set via AEROFISC_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body bytes accepted from the network.
    ///
    /// Set via AEROFISC_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via AEROFISC_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Push notification rendering.
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Background sync tag that triggers the transaction sync.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

/// How push payloads are turned into notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,
    /// Body used when the push carries no text.
    #[serde(default = "default_notification_body")]
    pub default_body: String,
    #[serde(default = "default_notification_icon")]
    pub icon: String,
    #[serde(default = "default_notification_badge")]
    pub badge: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
    /// Route opened by the `explore` action.
    #[serde(default = "default_explore_route")]
    pub explore_route: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./aerofisc-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_prefix() -> String {
    "budgetwise".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_precache_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_network_only_routes() -> Vec<String> {
    ["/api/auth/", "/api/transactions", "/api/budgets", "/api/goals", "/api/dashboard"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_dev_bypass_patterns() -> Vec<String> {
    [
        r"^/@(vite|react-refresh|fs|id)/",
        r"^/@react-refresh",
        r"/node_modules/",
        r"^/src/",
        r"\.(jsx|tsx|ts)(\?|$)",
        r"\.hot-update\.",
        r"[?&](t|v)=",
        r"[?&]import(&|=|$)",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_user_agent() -> String {
    "aerofisc-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_sync_tag() -> String {
    "sync-transactions".into()
}

fn default_notification_title() -> String {
    "BudgetWise".into()
}

fn default_notification_body() -> String {
    "New notification from BudgetWise".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_explore_route() -> String {
    "/dashboard".into()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            vibrate: default_vibrate(),
            explore_route: default_explore_route(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache_assets: default_precache_assets(),
            offline_page: default_offline_page(),
            network_only_routes: default_network_only_routes(),
            dev_bypass_patterns: default_dev_bypass_patterns(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationConfig::default(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin does not parse.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Store names for the configured prefix and version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(self.cache_prefix.clone(), self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `AEROFISC_SW_`
    /// 2. TOML file from `AEROFISC_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("AEROFISC_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("AEROFISC_SW_")
                .ignore(&["CONFIG_FILE"])
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
        assert_eq!(config.db_path, PathBuf::from("./aerofisc-sw-cache.sqlite"));
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.cache_prefix, "budgetwise");
        assert_eq!(config.cache_version, 1);
        assert_eq!(config.precache_assets, vec!["/", "/index.html", "/manifest.json", "/offline.html"]);
        assert_eq!(config.network_only_routes.len(), 5);
        assert_eq!(config.user_agent, "aerofisc-sw/0.1");
        assert_eq!(config.sync_tag, "sync-transactions");
        assert_eq!(config.notification.explore_route, "/dashboard");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_names_from_config() {
        let config = AppConfig { cache_version: 3, ..Default::default() };
        let names = config.cache_names();
        assert_eq!(names.static_name(), "budgetwise-static-v3");
        assert_eq!(names.dynamic_name(), "budgetwise-dynamic-v3");
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "http://localhost:3000/");

        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("cache_version = 4\n[notification]\ntitle = \"Aerofisc\"\n"));
        let config: AppConfig = figment.extract().unwrap();
        assert_eq!(config.cache_version, 4);
        assert_eq!(config.notification.title, "Aerofisc");
        assert_eq!(config.notification.icon, "/icons/icon-192x192.png");
        assert_eq!(config.offline_page, "/offline.html");
    }
}
