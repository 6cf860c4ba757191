//! Client side of the offline worker.
//!
//! This crate provides the network fetch pipeline and the worker itself:
//! lifecycle, routing, the fetch-and-cache helper and the push, click and
//! sync handlers. The server drives it through the MCP adapter.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use worker::{
    ActivateReport, ClickOutcome, FetchAndCache, FetchOutcome, InstallReport, Notification, PassReason, Policy,
    ResponseSource, Routed, Router, ServiceWorker, SyncOutcome, WaitUntil, WorkerConfig, WorkerState,
};
