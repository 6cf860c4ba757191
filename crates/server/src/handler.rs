//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and cache tools.
use std::sync::Arc;

use aerofisc_client::ServiceWorker;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::{
    CacheGetParams, CachePurgeParams, WorkerClickParams, WorkerFetchParams, WorkerPushParams, WorkerSyncParams, cache,
    worker,
};

/// The MCP server handler: one worker, shared by every tool call.
#[derive(Clone)]
pub struct WorkerServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WorkerServer {
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(description = "Deliver the install event: precache the app shell into the static store.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        worker::install_impl(&self.worker).await
    }

    #[tool(description = "Deliver the activate event: delete stores from other versions and claim clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        worker::activate_impl(&self.worker).await
    }

    /// Route one intercepted request.
    ///
    /// Reports pass-through with its reason, or the response and whether it
    /// came from the network, the cache or the offline page.
    #[tool(
        description = "Route a request through the worker. Returns pass_through with a reason, or the response with its source (network, cache, offline_fallback)."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        worker::fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push event. Returns the notification that would be shown.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        worker::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a notification click. Returns whether it closed and which route it opens.")]
    async fn worker_notification_click(
        &self, params: Parameters<WorkerClickParams>,
    ) -> Result<CallToolResult, McpError> {
        worker::click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a background sync event and wait for its sync task; in-flight revalidations are not awaited.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        worker::sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Show the cached entry a GET for the URL would match, optionally within one store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a cache store, or entries whose URL contains a pattern.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "aerofisc-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
