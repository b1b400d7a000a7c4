//! JSON codec for OFS requests and responses.
//!
//! # Wire Format
//!
//! A request is one UTF-8 JSON object:
//!
//! ```text
//! { "operation": "dir_list", "request_id": "gui_req",
//!   "parameters": { "path": "/docs" }, "session_id": "sess_..." }
//! ```
//!
//! and the server answers with one JSON object before closing the
//! connection:
//!
//! ```text
//! { "status": "success", "data": { ... } }
//! { "status": "error", "error_message": "...", "error_code": -2 }
//! ```
//!
//! There is no framing; the connection boundary delimits the message.

use serde_json::Value;

use crate::error::{ProtocolError, Result};
use crate::messages::{Failure, JsonObject, Operation, RequestEnvelope, ResponseResult, WireResponse};

/// Correlation identifier the server has always been sent.
pub const DEFAULT_REQUEST_ID: &str = "gui_req";

/// How the `request_id` field is filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIdStrategy {
    /// The same identifier on every request.
    Fixed(String),
    /// A fresh UUID v4 per request.
    Random,
}

impl Default for RequestIdStrategy {
    fn default() -> Self {
        RequestIdStrategy::Fixed(DEFAULT_REQUEST_ID.to_string())
    }
}

impl RequestIdStrategy {
    fn next_id(&self) -> String {
        match self {
            RequestIdStrategy::Fixed(id) => id.clone(),
            RequestIdStrategy::Random => uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Encoder and decoder for OFS JSON messages.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    request_ids: RequestIdStrategy,
}

impl JsonCodec {
    /// Create a codec that sends [`DEFAULT_REQUEST_ID`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with an explicit request id strategy.
    pub fn with_request_ids(request_ids: RequestIdStrategy) -> Self {
        Self { request_ids }
    }

    /// Build the envelope for one request.
    pub fn envelope(
        &self,
        operation: Operation,
        parameters: JsonObject,
        session_token: Option<&str>,
    ) -> RequestEnvelope {
        RequestEnvelope {
            operation,
            request_id: self.request_ids.next_id(),
            parameters,
            session_id: session_token.map(str::to_string),
        }
    }

    /// Encode a request into the bytes written to the connection.
    pub fn encode(
        &self,
        operation: Operation,
        parameters: JsonObject,
        session_token: Option<&str>,
    ) -> Result<Vec<u8>> {
        let envelope = self.envelope(operation, parameters, session_token);
        serde_json::to_vec(&envelope).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Parse response bytes, reporting any format problem as an error.
    pub fn decode_strict(&self, bytes: &[u8]) -> Result<WireResponse> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::Deserialization(
                "empty response".to_string(),
            ));
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ProtocolError::Deserialization(format!("invalid UTF-8: {e}")))?;

        // Structs also deserialize from arrays by position; only objects are responses
        match serde_json::from_str::<Value>(text)? {
            value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(ProtocolError::Deserialization(
                "expected a JSON object".to_string(),
            )),
        }
    }

    /// Decode response bytes into a tagged result.
    ///
    /// Never fails: anything that is not a well-formed response becomes a
    /// `Failure` describing what was wrong with it.
    pub fn decode(&self, bytes: &[u8]) -> ResponseResult {
        self.decode_strict(bytes)
            .and_then(ResponseResult::from_wire)
            .unwrap_or_else(|e| ResponseResult::Failure(Failure::malformed(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::DirectoryEntry;
    use serde_json::{json, Value};

    fn params(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_encode_with_session() {
        let codec = JsonCodec::new();
        let bytes = codec
            .encode(
                Operation::DirList,
                params(json!({ "path": "/docs" })),
                Some("sess_alice_1"),
            )
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "operation": "dir_list",
                "request_id": "gui_req",
                "parameters": { "path": "/docs" },
                "session_id": "sess_alice_1"
            })
        );
    }

    #[test]
    fn test_encode_without_session() {
        let codec = JsonCodec::new();
        let bytes = codec
            .encode(
                Operation::UserLogin,
                params(json!({ "username": "alice", "password": "pw" })),
                None,
            )
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("session_id").is_none());
        assert_eq!(value["parameters"]["username"], "alice");
    }

    #[test]
    fn test_random_request_ids_differ() {
        let codec = JsonCodec::with_request_ids(RequestIdStrategy::Random);
        let first = codec.envelope(Operation::GetStats, JsonObject::new(), None);
        let second = codec.envelope(Operation::GetStats, JsonObject::new(), None);
        assert_ne!(first.request_id, second.request_id);
        assert_eq!(first.request_id.len(), 36);
    }

    #[test]
    fn test_fixed_request_id() {
        let codec = JsonCodec::with_request_ids(RequestIdStrategy::Fixed("cli".to_string()));
        let envelope = codec.envelope(Operation::GetStats, JsonObject::new(), None);
        assert_eq!(envelope.request_id, "cli");
    }

    #[test]
    fn test_decode_listing() {
        let codec = JsonCodec::new();
        let request = codec
            .encode(Operation::DirList, params(json!({ "path": "/docs" })), Some("s"))
            .unwrap();
        let sent: RequestEnvelope = serde_json::from_slice(&request).unwrap();
        assert_eq!(sent.parameters["path"], "/docs");

        let response = br#"{"status":"success","data":{"files":[{"name":"a.txt","type":"file","size":10}]}}"#;
        let files: Vec<DirectoryEntry> = codec.decode(response).field("files").unwrap();

        assert_eq!(files, vec![DirectoryEntry::file("a.txt", Some(10))]);
    }

    #[test]
    fn test_decode_error_response() {
        let codec = JsonCodec::new();
        let result = codec.decode(
            br#"{ "status": "error", "request_id": "gui_req", "error_code": -2, "error_message": "Invalid credentials" }"#,
        );
        let failure = result.as_failure().unwrap();
        assert_eq!(failure.message, "Invalid credentials");
        assert_eq!(failure.code, Some(-2));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let codec = JsonCodec::new();
        let result = codec.decode(
            br#"{ "status": "success", "operation": "file_create", "request_id": "gui_req", "data": { "message": "Created" } }"#,
        );
        assert!(result.is_success());
    }

    #[test]
    fn test_decode_not_json() {
        let codec = JsonCodec::new();
        let result = codec.decode(b"<html>bad gateway</html>");
        let failure = result.as_failure().unwrap();
        assert!(failure.message.starts_with("malformed response"));
    }

    #[test]
    fn test_decode_missing_status() {
        let codec = JsonCodec::new();
        let result = codec.decode(br#"{ "data": {} }"#);
        let failure = result.as_failure().unwrap();
        assert!(failure.message.contains("no status"));
    }

    #[test]
    fn test_decode_empty() {
        let codec = JsonCodec::new();
        let result = codec.decode(b"");
        assert!(result.as_failure().unwrap().message.contains("empty response"));
        let result = codec.decode(b" \n");
        assert!(!result.is_success());
    }

    #[test]
    fn test_decode_truncated() {
        let codec = JsonCodec::new();
        let result = codec.decode(br#"{ "status": "success", "data": { "files": [ { "name": "#);
        assert!(result
            .as_failure()
            .unwrap()
            .message
            .starts_with("malformed response"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let codec = JsonCodec::new();
        let result = codec.decode(&[0x7b, 0xff, 0xfe, 0x7d]);
        assert!(result.as_failure().unwrap().message.contains("UTF-8"));
    }

    #[test]
    fn test_decode_rejects_non_object_payloads() {
        let codec = JsonCodec::new();
        for payload in [
            &br#"["success", {"files": []}]"#[..],
            &br#"["error", null, "boom"]"#[..],
            &b"42"[..],
            &br#""success""#[..],
            &b"null"[..],
        ] {
            let result = codec.decode(payload);
            assert!(!result.is_success(), "{payload:?}");
            let failure = result.as_failure().unwrap();
            assert!(
                failure.message.starts_with("malformed response"),
                "{}",
                failure.message
            );
        }

        let err = codec.decode_strict(b"[1, 2]").unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_decode_strict_reports_fault() {
        let codec = JsonCodec::new();
        assert!(matches!(
            codec.decode_strict(b"[1, 2"),
            Err(ProtocolError::Deserialization(_))
        ));
        let wire = codec.decode_strict(br#"{"status":"success"}"#).unwrap();
        assert_eq!(wire.status.as_deref(), Some("success"));
    }
}
