//! worker_install and worker_activate tool implementations.

use aerofisc_client::{ActivateReport, InstallReport, ServiceWorker, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use crate::tools::json_result;

#[derive(Debug, Serialize)]
pub struct InstallOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: InstallReport,
}

#[derive(Debug, Serialize)]
pub struct ActivateOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: ActivateReport,
}

/// Run the install event: precache the app shell.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    json_result(&InstallOutput { state: worker.state().await, report })
}

/// Run the activate event: drop stale stores and claim clients.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&ActivateOutput { state: worker.state().await, report })
}
