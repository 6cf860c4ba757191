//! Request routing policy.
//!
//! Classification is first-match-wins over a fixed order:
//!
//! 1. non-GET → pass through
//! 2. scheme other than http/https → pass through
//! 3. other origin → pass through
//! 4. development resource (configured patterns) → pass through
//! 5. API prefix → network first, cached copy only when the network fails
//! 6. anything else → stale-while-revalidate
//!
//! Pass-through means the worker does not respond at all and the caller
//! performs its own default fetch.

use std::sync::Arc;

use aerofisc_core::{CacheDb, Error, Request, Response};
use regex::RegexSet;
use serde::Serialize;
use tokio::sync::oneshot;
use url::Url;

use super::helper::FetchAndCache;
use super::{WaitUntil, WorkerConfig};
use crate::fetch::Fetcher;

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    NonGet,
    UnsupportedScheme,
    CrossOrigin,
    DevelopmentResource,
}

impl PassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassReason::NonGet => "non_get",
            PassReason::UnsupportedScheme => "unsupported_scheme",
            PassReason::CrossOrigin => "cross_origin",
            PassReason::DevelopmentResource => "development_resource",
        }
    }
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    PassThrough(PassReason),
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::OfflineFallback => "offline_fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Routed {
    pub response: Response,
    pub source: ResponseSource,
}

/// Result of handing a request to the router.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The worker did not respond; default network handling applies.
    PassThrough(PassReason),
    Responded(Routed),
}

impl FetchOutcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, FetchOutcome::PassThrough(_))
    }

    pub fn routed(&self) -> Option<&Routed> {
        match self {
            FetchOutcome::Responded(routed) => Some(routed),
            FetchOutcome::PassThrough(_) => None,
        }
    }
}

pub struct Router {
    origin: Url,
    api_prefixes: Vec<String>,
    bypass: RegexSet,
    offline_page: Request,
    cache: CacheDb,
    helper: FetchAndCache,
    background: WaitUntil,
}

impl Router {
    pub fn new(
        config: &WorkerConfig, cache: CacheDb, fetcher: Arc<dyn Fetcher>, background: WaitUntil,
    ) -> Result<Self, Error> {
        let bypass = RegexSet::new(&config.dev_bypass_patterns)
            .map_err(|e| Error::InvalidInput(format!("dev bypass pattern: {e}")))?;
        let offline_page = Request::get(config.resolve(&config.offline_page)?);
        let helper = FetchAndCache::new(fetcher, cache.clone(), config.names.dynamic_name());

        Ok(Self {
            origin: config.origin.clone(),
            api_prefixes: config.network_only_routes.clone(),
            bypass,
            offline_page,
            cache,
            helper,
            background,
        })
    }

    /// Decide what to do with a request. No I/O.
    pub fn classify(&self, request: &Request) -> Policy {
        if !request.is_get() {
            return Policy::PassThrough(PassReason::NonGet);
        }
        if !matches!(request.url.scheme(), "http" | "https") {
            return Policy::PassThrough(PassReason::UnsupportedScheme);
        }
        if !request.is_same_origin(&self.origin) {
            return Policy::PassThrough(PassReason::CrossOrigin);
        }
        if self.bypass.is_match(&request.path_and_query()) {
            return Policy::PassThrough(PassReason::DevelopmentResource);
        }

        let path = request.url.path();
        if self.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Policy::NetworkFirst;
        }

        Policy::StaleWhileRevalidate
    }

    /// Classify and serve a request.
    pub async fn route(&self, request: Request) -> Result<FetchOutcome, Error> {
        let policy = self.classify(&request);
        tracing::debug!(request = %request, ?policy, "routing");

        let routed = match policy {
            Policy::PassThrough(reason) => return Ok(FetchOutcome::PassThrough(reason)),
            Policy::NetworkFirst => self.network_first(&request).await?,
            Policy::StaleWhileRevalidate => self.stale_while_revalidate(request).await?,
        };

        Ok(FetchOutcome::Responded(routed))
    }

    async fn network_first(&self, request: &Request) -> Result<Routed, Error> {
        let network_err = match self.helper.fetch(request).await {
            Ok(response) => return Ok(Routed { response, source: ResponseSource::Network }),
            Err(e) => e,
        };

        match self.cache.match_request(request).await {
            Ok(Some(response)) => {
                tracing::info!(request = %request, error = %network_err, "network failed, serving cached copy");
                Ok(Routed { response, source: ResponseSource::Cache })
            }
            Ok(None) => Err(network_err),
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "cache lookup failed");
                Err(network_err)
            }
        }
    }

    async fn stale_while_revalidate(&self, request: Request) -> Result<Routed, Error> {
        let cached = match self.cache.match_request(&request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "cache lookup failed, treating as miss");
                None
            }
        };

        let is_navigation = request.is_navigation();
        let (tx, rx) = oneshot::channel();
        let helper = self.helper.clone();
        let refresh_request = request.clone();
        self.background
            .spawn(async move {
                let result = helper.fetch(&refresh_request).await;
                if let Err(e) = &result {
                    tracing::debug!(request = %refresh_request, error = %e, "revalidation failed");
                }
                // Nobody listening on a cache hit.
                let _ = tx.send(result);
            })
            .await;

        if let Some(response) = cached {
            return Ok(Routed { response, source: ResponseSource::Cache });
        }

        let network_err = match rx.await {
            Ok(Ok(response)) => return Ok(Routed { response, source: ResponseSource::Network }),
            Ok(Err(e)) => e,
            Err(_) => Error::Network(format!("{}: fetch task dropped", request.url)),
        };

        if is_navigation {
            match self.cache.match_request(&self.offline_page).await {
                Ok(Some(response)) => {
                    tracing::info!(request = %request, error = %network_err, "serving offline page");
                    return Ok(Routed { response, source: ResponseSource::OfflineFallback });
                }
                Ok(None) => tracing::warn!(request = %request, "offline page missing from cache"),
                Err(e) => tracing::warn!(request = %request, error = %e, "offline page lookup failed"),
            }
        }

        Err(network_err)
    }
}
