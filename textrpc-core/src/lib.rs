//! # textrpc-core
//!
//! Function registry and built-in functions for textrpc.
//!
//! This crate provides:
//! - The immutable function registry and its builder
//! - The process-wide call counter
//! - Built-in functions (help, functions, calls, rot13, max_even, file listing)
//! - The recursive listing collaborator used by `list_files3`

pub mod counter;
pub mod error;
pub mod functions;
pub mod listing;
pub mod registry;

pub use counter::CallCounter;
pub use error::CoreError;
pub use functions::builtin_registry;
pub use listing::{ListingOutput, LsCommand, RecursiveLister};
pub use registry::{CallContext, FunctionEntry, Handler, Registry, RegistryBuilder};
