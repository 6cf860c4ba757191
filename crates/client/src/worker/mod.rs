//! Offline worker: install/activate lifecycle, request routing and the
//! push, notification-click and background-sync handlers.
//!
//! The worker is driven by an external event adapter. It never owns a
//! browser; everything it touches is a [`CacheDb`] and a [`Fetcher`], so
//! each handler can be exercised in-process.

pub mod events;
pub mod helper;
pub mod lifecycle;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::sync::Arc;

use aerofisc_core::config::NotificationConfig;
use aerofisc_core::{AppConfig, CacheNames, Error};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::resolve;

pub use events::{ClickOutcome, Notification, NotificationAction, SyncOutcome};
pub use helper::FetchAndCache;
pub use lifecycle::{ActivateReport, InstallReport, ServiceWorker, WorkerState};
pub use router::{FetchOutcome, PassReason, Policy, ResponseSource, Routed, Router};

/// Everything a worker version needs to know, fixed at construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub names: CacheNames,
    pub precache_assets: Vec<String>,
    pub offline_page: String,
    pub network_only_routes: Vec<String>,
    pub dev_bypass_patterns: Vec<String>,
    pub notification: NotificationConfig,
    pub sync_tag: String,
}

impl WorkerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            names: config.cache_names(),
            precache_assets: config.precache_assets.clone(),
            offline_page: config.offline_page.clone(),
            network_only_routes: config.network_only_routes.clone(),
            dev_bypass_patterns: config.dev_bypass_patterns.clone(),
            notification: config.notification.clone(),
            sync_tag: config.sync_tag.clone(),
        })
    }

    /// Resolve a path or URL against the worker origin.
    pub fn resolve(&self, target: &str) -> Result<Url, Error> {
        resolve(&self.origin, target).map_err(|e| Error::InvalidUrl(format!("{target}: {e}")))
    }
}

/// Background work the worker must not be torn down before.
///
/// Mirrors the "wait until" extension: a task registered here keeps running
/// even if whoever triggered it stops listening, and [`WaitUntil::settle`]
/// drains them all.
#[derive(Clone, Default)]
pub struct WaitUntil {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Finished tasks are reaped on the way in.
    pub async fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        tasks.spawn(task);
    }

    /// Number of tasks not yet reaped.
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for every registered task, including ones registered while
    /// waiting. Returns how many were drained.
    pub async fn settle(&self) -> usize {
        let mut drained = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.tasks.lock().await);
            if batch.is_empty() {
                return drained;
            }
            while let Some(done) = batch.join_next().await {
                if let Err(e) = done {
                    tracing::warn!(error = %e, "background task ended abnormally");
                }
                drained += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_config_from_app() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.origin.as_str(), "http://localhost:3000/");
        assert_eq!(config.names.static_name(), "budgetwise-static-v1");
        assert_eq!(config.offline_page, "/offline.html");
    }

    #[test]
    fn test_worker_config_resolve() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.resolve("/offline.html").unwrap().as_str(), "http://localhost:3000/offline.html");
        assert!(config.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_wait_until_settles_all() {
        let wait = WaitUntil::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = counter.clone();
            wait.spawn(async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        assert_eq!(wait.settle().await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(wait.pending().await, 0);
        assert_eq!(wait.settle().await, 0);
    }
}
