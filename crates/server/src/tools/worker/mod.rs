//! Worker event tools.
//!
//! Each tool delivers one event to the shared worker and reports what it did.

pub mod events;
pub mod fetch;
pub mod lifecycle;

pub use events::{WorkerClickParams, WorkerPushParams, WorkerSyncParams, click_impl, push_impl, sync_impl};
pub use fetch::{WorkerFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};
