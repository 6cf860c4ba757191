//! Worker lifecycle as an explicit state machine.
//!
//! ```text
//! parsed ──install──▶ installing ──ok──▶ waiting ──activate──▶ activating ──▶ active
//!                          │                                                     │
//!                          └──precache failed──▶ redundant ◀──────teardown───────┘
//! ```
//!
//! A redundant worker may be installed again; that models the browser
//! retrying registration.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aerofisc_core::{CacheDb, Error, Request, Response};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, oneshot};

use super::events::{self, ClickOutcome, Notification, SyncOutcome};
use super::router::{FetchOutcome, Router};
use super::{WaitUntil, WorkerConfig};
use crate::fetch::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub static_store: String,
    pub precached: Vec<String>,
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub clients_claimed: bool,
}

pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    cache: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    router: Router,
    background: WaitUntil,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl ServiceWorker {
    /// Build a worker in the `parsed` state. Nothing is fetched or stored yet.
    pub fn init(config: WorkerConfig, cache: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let background = WaitUntil::new();
        let router = Router::new(&config, cache.clone(), fetcher.clone(), background.clone())?;
        Ok(Self {
            config: Arc::new(config),
            cache,
            fetcher,
            router,
            background,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    /// Set once install succeeds: this version does not wait for older ones.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Move to `next` if the current state is one of `allowed`.
    async fn transition(&self, allowed: &[WorkerState], next: WorkerState, event: &str) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !allowed.contains(&*state) {
            return Err(Error::InvalidState { from: state.to_string(), event: event.to_string() });
        }
        tracing::debug!(from = %*state, to = %next, event, "worker transition");
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
    }

    async fn ensure_active(&self, event: &str) -> Result<(), Error> {
        let state = self.state().await;
        if state != WorkerState::Active {
            return Err(Error::InvalidState { from: state.to_string(), event: event.to_string() });
        }
        Ok(())
    }

    /// Precache the manifest into the static store.
    ///
    /// Every asset is fetched before anything is written; a single failure
    /// leaves the worker redundant and the static store absent.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing, "install")
            .await?;
        tracing::info!(version = %self.config.names.static_name(), "worker install");

        match self.precache().await {
            Ok(report) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Waiting).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let requests = self
            .config
            .precache_assets
            .iter()
            .map(|asset| self.config.resolve(asset).map(Request::get))
            .collect::<Result<Vec<_>, Error>>()?;

        let fetched = join_all(requests.iter().map(|req| self.fetcher.fetch(req))).await;

        let mut entries: Vec<(&Request, Response)> = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(fetched) {
            match result {
                Ok(response) if response.ok() => entries.push((request, response)),
                Ok(response) => {
                    return Err(Error::PrecacheFailed {
                        url: request.url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Err(e) => return Err(Error::PrecacheFailed { url: request.url.to_string(), reason: e.to_string() }),
            }
        }

        let static_name = self.config.names.static_name();
        let store = self.cache.open_store(&static_name).await?;
        tracing::info!(store = %static_name, assets = entries.len(), "caching static assets");
        for (request, response) in &entries {
            if let Err(e) = store.put(request, response).await {
                if let Err(cleanup) = self.cache.delete_store(&static_name).await {
                    tracing::warn!(store = %static_name, error = %cleanup, "could not discard partial precache");
                }
                return Err(e);
            }
        }

        Ok(InstallReport {
            static_store: static_name,
            precached: requests.iter().map(|r| r.url.to_string()).collect(),
            skip_waiting: true,
        })
    }

    /// Drop stores left behind by other versions and take control of pages.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Waiting], WorkerState::Activating, "activate")
            .await?;
        tracing::info!("worker activate");

        let names = &self.config.names;
        let existing = match self.cache.store_names().await {
            Ok(existing) => existing,
            Err(e) => {
                self.set_state(WorkerState::Waiting).await;
                return Err(e);
            }
        };

        let mut deleted = Vec::new();
        for name in existing.into_iter().filter(|n| names.is_stale(n)) {
            tracing::info!(store = %name, "deleting old cache");
            match self.cache.delete_store(&name).await {
                Ok(_) => deleted.push(name),
                Err(e) => {
                    self.set_state(WorkerState::Waiting).await;
                    return Err(e);
                }
            }
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Active).await;

        Ok(ActivateReport {
            deleted,
            kept: vec![names.static_name(), names.dynamic_name()],
            clients_claimed: true,
        })
    }

    /// Route an intercepted request. Only an active worker sees fetches.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        self.ensure_active("fetch").await?;
        self.router.route(request).await
    }

    pub async fn on_push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        self.ensure_active("push").await?;
        let notification = events::render_push(&self.config.notification, payload);
        tracing::info!(title = %notification.title, "showing notification");
        Ok(notification)
    }

    pub async fn on_notification_click(&self, action: Option<&str>) -> Result<ClickOutcome, Error> {
        self.ensure_active("notificationclick").await?;
        Ok(events::notification_click(&self.config.notification, action))
    }

    pub async fn on_sync(&self, tag: &str) -> Result<SyncOutcome, Error> {
        let (outcome, _done) = self.schedule_sync(tag).await?;
        Ok(outcome)
    }

    /// Deliver a sync event and wait for the sync task alone.
    ///
    /// Other background work, such as in-flight revalidations, keeps running.
    /// The flag is `true` when a scheduled sync ran to completion.
    pub async fn on_sync_and_wait(&self, tag: &str) -> Result<(SyncOutcome, bool), Error> {
        let (outcome, done) = self.schedule_sync(tag).await?;
        let completed = match done {
            Some(done) => done.await.is_ok(),
            None => false,
        };
        Ok((outcome, completed))
    }

    async fn schedule_sync(&self, tag: &str) -> Result<(SyncOutcome, Option<oneshot::Receiver<()>>), Error> {
        self.ensure_active("sync").await?;
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync tag");
            return Ok((SyncOutcome::Ignored { tag: tag.to_string() }, None));
        }
        let (tx, rx) = oneshot::channel();
        self.background
            .spawn(async move {
                events::sync_transactions().await;
                let _ = tx.send(());
            })
            .await;
        Ok((SyncOutcome::Scheduled { tag: tag.to_string() }, Some(rx)))
    }

    /// Wait for background work (revalidations, sync) to finish.
    pub async fn settle(&self) -> usize {
        self.background.settle().await
    }

    /// Settle outstanding work and retire this worker.
    pub async fn teardown(&self) {
        let drained = self.settle().await;
        self.set_state(WorkerState::Redundant).await;
        self.clients_claimed.store(false, Ordering::SeqCst);
        tracing::info!(drained, "worker torn down");
    }
}
