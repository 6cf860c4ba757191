//! worker_push, worker_notification_click and worker_sync tool implementations.

use aerofisc_client::{ClickOutcome, Notification, ServiceWorker, SyncOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::tools::json_result;

/// Input parameters for worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push payload text. Omitted or empty payloads get the default body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Input parameters for worker_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerClickParams {
    /// Action button pressed: "explore", "close", or none for the body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Input parameters for worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Background sync tag.
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct PushOutput {
    pub notification: Notification,
}

#[derive(Debug, Serialize)]
pub struct SyncOutput {
    pub sync: SyncOutcome,
    /// Whether the scheduled sync work finished before returning.
    pub completed: bool,
}

pub async fn push_impl(worker: &ServiceWorker, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_deref()).await?;
    json_result(&PushOutput { notification })
}

pub async fn click_impl(worker: &ServiceWorker, params: WorkerClickParams) -> Result<CallToolResult, McpError> {
    let outcome: ClickOutcome = worker.on_notification_click(params.action.as_deref()).await?;
    json_result(&outcome)
}

/// Deliver a sync event and wait for the sync task it scheduled.
///
/// Revalidations still in flight are not awaited.
pub async fn sync_impl(worker: &ServiceWorker, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(AdapterError::InvalidInput("tag cannot be empty".into()).into());
    }
    let (outcome, completed) = worker.on_sync_and_wait(&params.tag).await?;
    json_result(&SyncOutput { sync: outcome, completed })
}
