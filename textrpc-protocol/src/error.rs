//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Returns whether the peer sent something that could not be understood,
    /// as opposed to a local encoding failure.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ProtocolError::MalformedEnvelope(_) | ProtocolError::InvalidUtf8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MalformedEnvelope("missing field `args`".to_string());
        let msg = err.to_string();
        assert!(msg.starts_with("malformed envelope"));
        assert!(msg.contains("args"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_is_malformed() {
        assert!(ProtocolError::MalformedEnvelope("x".into()).is_malformed());
        assert!(ProtocolError::InvalidUtf8.is_malformed());

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(!ProtocolError::Json(json_err).is_malformed());
    }
}
