//! cache_purge tool implementation.
//!
//! Deletes a whole store, or entries whose URL contains a pattern.

use aerofisc_client::ServiceWorker;
use aerofisc_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to purge. Alone, the whole store is deleted; with
    /// `url_pattern`, only matching entries in it.
    #[serde(default)]
    pub store: Option<String>,

    /// Purge entries whose URL contains this substring.
    #[serde(default)]
    pub url_pattern: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Stores removed outright.
    pub stores_deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &ServiceWorker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let cache = worker.cache();
    let pattern = params.url_pattern.as_deref().filter(|p| !p.is_empty());

    if let Some(store) = params.store.as_deref()
        && !cache.has_store(store).await?
    {
        return Err(AdapterError::UnknownStore(store.to_string()).into());
    }

    let output = match (params.store.as_deref(), pattern) {
        (None, None) => {
            return Err(Error::InvalidInput("At least one of store or url_pattern must be specified".to_string()).into());
        }
        (Some(store), None) => {
            let deleted = cache.open_store(store).await?.len().await?;
            cache.delete_store(store).await?;
            tracing::info!(store, deleted, "store purged");
            CachePurgeOutput { deleted, stores_deleted: vec![store.to_string()] }
        }
        (store, Some(pattern)) => {
            let deleted = cache.purge_entries_by_url(store, pattern).await?;
            tracing::info!(?store, pattern, deleted, "entries purged");
            CachePurgeOutput { deleted, stores_deleted: Vec::new() }
        }
    };

    json_result(&output)
}
