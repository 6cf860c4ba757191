//! MCP tool implementations.
//!
//! Worker tools deliver lifecycle and functional events to the
//! [`ServiceWorker`](aerofisc_client::ServiceWorker); cache tools inspect and
//! prune the stores directly.

pub mod cache;
pub mod worker;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use worker::{WorkerClickParams, WorkerFetchParams, WorkerPushParams, WorkerSyncParams};

use aerofisc_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use aerofisc_client::{Fetcher, ServiceWorker, WorkerConfig};
    use aerofisc_core::{AppConfig, CacheDb, Error, Request, Response, ResponseType};
    use async_trait::async_trait;
    use rmcp::model::CallToolResult;

    pub(crate) const ORIGIN: &str = "https://app.test";

    /// Serves scripted bodies; unknown URLs get a 404, `offline` fails everything.
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        bodies: Mutex<HashMap<String, &'static str>>,
        offline: Mutex<bool>,
    }

    impl StubFetcher {
        pub(crate) fn with_app_shell() -> Self {
            let stub = Self::default();
            for path in ["/", "/index.html", "/manifest.json", "/offline.html"] {
                stub.serve(path, "<html>shell</html>");
            }
            stub
        }

        pub(crate) fn serve(&self, path: &str, body: &'static str) {
            self.bodies.lock().unwrap().insert(format!("{ORIGIN}{path}"), body);
        }

        pub(crate) fn go_offline(&self) {
            *self.offline.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let url = request.url.to_string();
            if *self.offline.lock().unwrap() {
                return Err(Error::Network(format!("{url}: offline")));
            }
            let response = match self.bodies.lock().unwrap().get(&url) {
                Some(body) => Response::new(200, ResponseType::Basic, url, *body).with_header("content-type", "text/html"),
                None => Response::new(404, ResponseType::Basic, url, "not found"),
            };
            Ok(response)
        }
    }

    pub(crate) async fn worker(fetcher: Arc<StubFetcher>) -> Arc<ServiceWorker> {
        let config = WorkerConfig::from_app(&AppConfig { origin: ORIGIN.into(), ..Default::default() }).unwrap();
        let cache = CacheDb::open_in_memory().await.unwrap();
        Arc::new(ServiceWorker::init(config, cache, fetcher).unwrap())
    }

    pub(crate) async fn active_worker(fetcher: Arc<StubFetcher>) -> Arc<ServiceWorker> {
        let sw = worker(fetcher).await;
        sw.install().await.unwrap();
        sw.activate().await.unwrap();
        sw
    }

    pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
