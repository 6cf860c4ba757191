//! worker_fetch tool implementation.
//!
//! Hands a synthetic intercepted request to the worker and reports whether it
//! was passed through or answered, and from where.

use std::collections::BTreeMap;
use std::str::FromStr;

use aerofisc_client::{FetchOutcome, ServiceWorker};
use aerofisc_core::{Destination, Request};
use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::tools::json_result;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request destination: "document" for navigations, "script", "image", ...
    #[serde(default)]
    pub destination: Option<String>,

    /// Request headers forwarded to the network, e.g. `Accept`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The request URL after resolution.
    pub url: String,
    /// "pass_through" or "responded".
    pub outcome: String,
    /// Why the worker declined to respond.
    pub reason: Option<String>,
    /// "network", "cache" or "offline_fallback".
    pub source: Option<String>,
    pub status: Option<u16>,
    pub response_type: Option<String>,
    pub content_type: Option<String>,
    pub body_len: Option<usize>,
    /// Body as text, when it is valid UTF-8.
    pub body: Option<String>,
    /// ISO8601 timestamp of when the request was handled.
    pub handled_at: String,
}

fn build_request(worker: &ServiceWorker, params: &WorkerFetchParams) -> Result<Request, McpError> {
    if params.url.trim().is_empty() {
        return Err(AdapterError::InvalidInput("url cannot be empty".into()).into());
    }

    let method = params.method.as_deref().unwrap_or("GET").trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AdapterError::InvalidInput(format!("invalid method: {method:?}")).into());
    }

    let url = worker.config().resolve(&params.url)?;
    let mut request = Request::new(method, url);
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(Destination::from_str(destination)?);
    }
    for (name, value) in &params.headers {
        if name.trim().is_empty() {
            return Err(AdapterError::InvalidInput("header name cannot be empty".into()).into());
        }
        request = request.with_header(name.trim(), value.as_str());
    }
    Ok(request)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params)?;
    let url = request.url.to_string();

    let outcome = match worker.handle_fetch(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_network() {
                tracing::warn!(url = %url, error = %e, "no network and no cached copy");
            }
            return Err(e.into());
        }
    };

    let handled_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let output = match outcome {
        FetchOutcome::PassThrough(reason) => WorkerFetchOutput {
            url,
            outcome: "pass_through".into(),
            reason: Some(reason.as_str().into()),
            source: None,
            status: None,
            response_type: None,
            content_type: None,
            body_len: None,
            body: None,
            handled_at,
        },
        FetchOutcome::Responded(routed) => {
            let response = routed.response;
            WorkerFetchOutput {
                url,
                outcome: "responded".into(),
                reason: None,
                source: Some(routed.source.as_str().into()),
                status: Some(response.status),
                response_type: Some(response.response_type.as_str().into()),
                content_type: response.content_type().map(str::to_string),
                body_len: Some(response.body.len()),
                body: std::str::from_utf8(&response.body).ok().map(str::to_string),
                handled_at,
            }
        }
    };

    json_result(&output)
}
