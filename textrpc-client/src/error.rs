//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] textrpc_protocol::ProtocolError),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request timeout")]
    Timeout,
}

impl ClientError {
    /// Returns whether the server could not be reached at all.
    pub fn is_connect_error(&self) -> bool {
        matches!(self, ClientError::Connect { .. } | ClientError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let err = ClientError::Connect {
            addr: "127.0.0.1:7777".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "failed to connect to 127.0.0.1:7777: refused");
        assert!(err.is_connect_error());
        assert!(!ClientError::Protocol(textrpc_protocol::ProtocolError::InvalidUtf8)
            .is_connect_error());
    }
}
