//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use regex::Regex;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - `cache_prefix` is empty or contains whitespace or `-`, or `cache_version` is 0
    /// - `offline_page` is missing from `precache_assets`
    /// - a route or asset path does not start with `/`
    /// - a `dev_bypass_patterns` entry is not a valid regex
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `precache_assets` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(invalid("cache_prefix", "must be non-empty and contain no whitespace or '-'"));
        }
        if self.cache_version == 0 {
            return Err(invalid("cache_version", "must be at least 1"));
        }

        if self.precache_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_assets".into(),
                hint: "list at least the offline page".into(),
            });
        }
        if let Some(bad) = self.precache_assets.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache_assets", format!("path must start with '/': {bad}")));
        }
        if !self.precache_assets.contains(&self.offline_page) {
            return Err(invalid(
                "offline_page",
                format!("{} must be listed in precache_assets", self.offline_page),
            ));
        }

        if let Some(bad) = self.network_only_routes.iter().find(|r| !r.starts_with('/')) {
            return Err(invalid("network_only_routes", format!("prefix must start with '/': {bad}")));
        }

        for pattern in &self.dev_bypass_patterns {
            Regex::new(pattern).map_err(|e| invalid("dev_bypass_patterns", format!("{pattern}: {e}")))?;
        }

        if !self.notification.explore_route.starts_with('/') {
            return Err(invalid("notification.explore_route", "must start with '/'"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.network_only_routes.is_empty() {
            tracing::warn!("network_only_routes is empty; API responses will be served stale-while-revalidate");
        }

        Ok(())
    }
}
