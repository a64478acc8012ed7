//! Core error types.

use thiserror::Error;

/// Errors from the registry and the built-in functions.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("function already registered: {name}")]
    DuplicateName { name: String },

    #[error("function not found: {name}")]
    FunctionNotFound { name: String },

    #[error("no even integer")]
    NoEvenInteger,

    #[error("invalid integer '{0}'")]
    InvalidInteger(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Renders the error as the text a handler sends back in place of a result.
    ///
    /// The wire carries no error channel, so this rendering is what clients
    /// match on. It must stay stable.
    pub fn to_reply(&self) -> String {
        format!("error: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_rendering_is_stable() {
        assert_eq!(CoreError::NoEvenInteger.to_reply(), "error: no even integer");
        assert_eq!(
            CoreError::InvalidInteger("abc".to_string()).to_reply(),
            "error: invalid integer 'abc'"
        );
    }

    #[test]
    fn test_registry_error_display() {
        let err = CoreError::DuplicateName {
            name: "rot13".to_string(),
        };
        assert!(err.to_string().contains("rot13"));

        let err = CoreError::FunctionNotFound {
            name: "nope".to_string(),
        };
        assert!(err.to_string().contains("nope"));
    }
}
