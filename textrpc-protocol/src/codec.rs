//! Encoder and decoder for request envelopes and text replies.

use crate::error::ProtocolError;
use crate::message::{Request, Response};
use crate::LINE_TERMINATOR;
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

/// Encodes requests and responses into wire bytes.
pub struct Encoder;

impl Encoder {
    /// Encodes a request as a single JSON object.
    pub fn encode_request(request: &Request) -> Result<Bytes, ProtocolError> {
        let bytes = serde_json::to_vec(request)?;
        Ok(Bytes::from(bytes))
    }

    /// Encodes a response as UTF-8 text followed by `\r\n`.
    pub fn encode_response(response: &Response) -> Bytes {
        let text = response.as_str();
        let mut buf = BytesMut::with_capacity(text.len() + LINE_TERMINATOR.len());
        buf.put_slice(text.as_bytes());
        buf.put_slice(LINE_TERMINATOR.as_bytes());
        buf.freeze()
    }
}

/// Decodes wire bytes into requests and responses.
pub struct Decoder;

impl Decoder {
    /// Returns whether a payload carries no request at all.
    ///
    /// Zero bytes or whitespace only; the server answers nothing to these.
    pub fn is_empty_payload(data: &[u8]) -> bool {
        data.iter().all(u8::is_ascii_whitespace)
    }

    /// Decodes a request envelope.
    ///
    /// The payload must be a JSON object with a string `function` and an
    /// array of strings `args`. Surrounding whitespace is ignored, and so are
    /// keys other than those two.
    pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
        let payload = std::str::from_utf8(data)
            .map_err(|e| ProtocolError::MalformedEnvelope(format!("invalid UTF-8: {}", e)))?;

        let value: Value = serde_json::from_str(payload.trim())
            .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;

        if !value.is_object() {
            return Err(ProtocolError::MalformedEnvelope(
                "expected a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Decodes a reply, removing the trailing `\r\n` if present.
    pub fn decode_response(data: &[u8]) -> Result<Response, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
        let text = text.strip_suffix(LINE_TERMINATOR).unwrap_or(text);
        Ok(Response::new(text))
    }
}
