//! cache_get tool implementation.
//!
//! Looks up the entry a GET for `url` would match.

use aerofisc_client::ServiceWorker;
use aerofisc_core::{Error, Request, cache::EntryInfo};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// Restrict the lookup to one store; all stores when omitted.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The matched entry, without its body.
    pub entry: EntryInfo,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &ServiceWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let cache = worker.cache();
    if let Some(store) = params.store.as_deref()
        && !cache.has_store(store).await?
    {
        return Err(AdapterError::UnknownStore(store.to_string()).into());
    }

    let request = Request::get(worker.config().resolve(&params.url)?);
    let entry = cache
        .entry_info(params.store.as_deref(), &request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    json_result(&CacheGetOutput { entry })
}
