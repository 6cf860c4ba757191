//! Fetch-and-cache: the single place network responses enter the dynamic store.

use std::sync::Arc;

use aerofisc_core::{CacheDb, Error, Request, Response};

use crate::fetch::Fetcher;

/// Fetches a request and, for a 200 same-origin response, writes a copy into
/// the dynamic store before handing the original back.
#[derive(Clone)]
pub struct FetchAndCache {
    fetcher: Arc<dyn Fetcher>,
    cache: CacheDb,
    store_name: String,
}

impl FetchAndCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: CacheDb, store_name: impl Into<String>) -> Self {
        Self { fetcher, cache, store_name: store_name.into() }
    }

    /// Run the fetch.
    ///
    /// A failed fetch leaves the store untouched and returns the error. A
    /// failed store write is logged; the caller still gets the response.
    pub async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(request = %request, error = %e, "fetch failed");
                return Err(e);
            }
        };

        if response.is_cacheable() {
            let stored = response.duplicate();
            let written = match self.cache.open_store(&self.store_name).await {
                Ok(store) => store.put(request, &stored).await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::warn!(request = %request, store = %self.store_name, error = %e, "cache write failed");
            }
        } else {
            tracing::trace!(
                request = %request,
                status = response.status,
                response_type = response.response_type.as_str(),
                "response not cacheable"
            );
        }

        Ok(response)
    }
}
