//! # textrpc-client
//!
//! Client library for textrpc.
//!
//! This crate provides:
//! - One-shot calls: connect, send one request, read the reply, close
//! - Typed helpers for the built-in functions

pub mod client;
pub mod connection;
pub mod error;

pub use client::{Client, ListingMode};
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
