//! SQLite-backed request/response stores.
//!
//! A persistent stand-in for the browser's cache storage, with async access
//! via tokio-rusqlite. It provides:
//!
//! - Named, versioned stores holding request -> response snapshots
//! - Keys derived from the normalized request (method + URL) via SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::{CacheNames, StoreRole};
pub use stores::{EntryInfo, Store};
