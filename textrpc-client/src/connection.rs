//! Connection management.
//!
//! Every call opens its own TCP connection: the request is written, the
//! reply is read until the server closes the socket or the read buffer is
//! full, and the connection is dropped.

use crate::error::ClientError;
use std::time::Duration;
use textrpc_protocol::{
    Decoder, Encoder, Request, Response, CLIENT_READ_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = CLIENT_READ_BUFFER_SIZE;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for writing the request and reading the reply.
    pub request_timeout: Duration,
    /// Largest reply accepted, in bytes.
    pub read_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    /// Returns the endpoint as `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Performs single-request exchanges with a textrpc server.
#[derive(Debug, Clone)]
pub struct Connection {
    config: ConnectionConfig,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Sends one request on a fresh connection and returns the reply.
    ///
    /// Connection failures are returned as is; nothing is retried.
    pub async fn call(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = self.connect().await?;
        let payload = Encoder::encode_request(request)?;

        tokio::time::timeout(self.config.request_timeout, async {
            stream.write_all(&payload).await?;
            tracing::debug!("Sent {} bytes", payload.len());

            let reply = Self::read_reply(&mut stream, self.config.read_buffer_size).await?;
            tracing::debug!("Received {} bytes", reply.len());

            Ok::<_, ClientError>(Decoder::decode_response(&reply)?)
        })
        .await
        .map_err(|_| {
            tracing::debug!("Request timeout");
            ClientError::Timeout
        })?
    }

    async fn connect(&self) -> Result<TcpStream, ClientError> {
        let endpoint = self.config.endpoint();
        tracing::debug!("Connecting to {}...", endpoint);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(endpoint.as_str()),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|source| {
            tracing::debug!("Connection failed: {}", source);
            ClientError::Connect {
                addr: endpoint.clone(),
                source,
            }
        })?;

        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Reads until EOF or until `limit` bytes have arrived.
    async fn read_reply(stream: &mut TcpStream, limit: usize) -> Result<Vec<u8>, ClientError> {
        let mut buf = vec![0u8; limit];
        let mut filled = 0;
        while filled < limit {
            let n = stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}
