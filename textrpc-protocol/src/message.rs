//! Request and response message types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request message envelope.
///
/// On the wire this is a single JSON object with exactly the keys
/// `function` and `args`. Every argument travels as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the registered function to call.
    pub function: String,

    /// Positional arguments, in call order.
    pub args: Vec<String>,
}

impl Request {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Response text.
///
/// A response is either a function's return value or a diagnostic. The two
/// are indistinguishable on the wire; callers inspect the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Response {
    text: String,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the reply sent for an unregistered function name.
    pub fn unknown_function() -> Self {
        Self::new(crate::UNKNOWN_FUNCTION)
    }

    /// Returns the diagnostic sent back when the request cannot be decoded.
    pub fn malformed(reason: impl fmt::Display) -> Self {
        Self::new(format!("Malformed request: {}", reason))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns whether this is the unknown-function reply.
    pub fn is_unknown_function(&self) -> bool {
        self.text == crate::UNKNOWN_FUNCTION
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new("max_even").with_args(["1", "2"]).with_arg("0x4");
        assert_eq!(request.function, "max_even");
        assert_eq!(request.args, vec!["1", "2", "0x4"]);
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = Request::new("rot13").with_arg("abc");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"function": "rot13", "args": ["abc"]})
        );
    }

    #[test]
    fn test_response_helpers() {
        assert!(Response::unknown_function().is_unknown_function());
        assert!(!Response::new("nop").is_unknown_function());
        assert!(Response::default().is_empty());

        let malformed = Response::malformed("missing field `args`");
        assert_eq!(
            malformed.as_str(),
            "Malformed request: missing field `args`"
        );
    }

    #[test]
    fn test_response_display() {
        let response = Response::from("4 calls so far ...");
        assert_eq!(response.to_string(), "4 calls so far ...");
        assert_eq!(response.into_string(), "4 calls so far ...");
    }
}
