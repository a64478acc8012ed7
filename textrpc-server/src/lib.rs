//! # textrpc-server
//!
//! TCP server for textrpc.
//!
//! This crate provides:
//! - The dispatcher: registry lookup, call counting, handler invocation
//! - The per-connection request/response state machine
//! - The accept loop with address reuse and graceful shutdown
//! - YAML + environment configuration
//! - Optional Prometheus metrics endpoint

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod server;
pub mod session;

pub use config::{Config, ConfigError, FunctionsConfig, MetricsConfig, NetworkConfig};
pub use dispatcher::Dispatcher;
pub use error::ServerError;
pub use metrics::Metrics;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{Session, SessionState};
