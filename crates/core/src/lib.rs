//! Core types and shared functionality for the offline worker.
//!
//! This crate provides:
//! - Request/response values passed between router, stores and network
//! - Named cache stores with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheNames, Store};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, Response, ResponseType};
