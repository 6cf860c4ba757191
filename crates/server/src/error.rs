//! Structured errors for the adapter layer.
//!
//! Worker and cache failures use `aerofisc_core::Error`; these cover tool
//! parameters the worker never sees.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Invalid tool parameters (e.g., a malformed method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool named a cache store that does not exist.
    #[error("UNKNOWN_STORE: {0}")]
    UnknownStore(String),
}

impl From<AdapterError> for McpError {
    fn from(err: AdapterError) -> Self {
        let code = match &err {
            AdapterError::InvalidInput(_) => -32602,
            AdapterError::UnknownStore(_) => -32004,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
