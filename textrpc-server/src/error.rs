//! Server error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] textrpc_protocol::ProtocolError),

    #[error("core error: {0}")]
    Core(#[from] textrpc_core::CoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("could not resolve address {0}")]
    AddressResolution(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("handler task failed: {0}")]
    HandlerFailed(String),
}

impl ServerError {
    /// Returns whether the error happened while setting up the listener.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            ServerError::AddressResolution(_) | ServerError::Bind { .. } | ServerError::Config(_)
        )
    }
}
