//! # textrpc-protocol
//!
//! Wire protocol implementation for textrpc.
//!
//! This crate provides:
//! - The request envelope: one JSON object `{"function": ..., "args": [...]}`
//! - The reply encoding: plain UTF-8 text terminated by `\r\n`
//! - Protocol errors and constants
//!
//! There is no framing. One connection carries exactly one request and at
//! most one reply, and the payload read for that connection is the message.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use message::{Request, Response};

/// Default port for the textrpc server.
pub const DEFAULT_PORT: u16 = 7777;

/// Default host for the textrpc server and client.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Bytes the server reads for one request.
pub const SERVER_READ_BUFFER_SIZE: usize = 4096;

/// Bytes the client reads for one reply.
pub const CLIENT_READ_BUFFER_SIZE: usize = 8192;

/// Terminator appended to every reply on the wire.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Reply text for a request naming an unregistered function.
pub const UNKNOWN_FUNCTION: &str = "Unknown function";
