//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering encode and decode failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize a request.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize a response.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The response carried no `status` field.
    #[error("response has no status field")]
    MissingStatus,

    /// The response carried a `status` other than `success` or `error`.
    #[error("unknown response status: {0}")]
    UnknownStatus(String),

    /// A field the operation requires was absent from the response data.
    #[error("missing field in response data: {0}")]
    MissingField(String),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            ProtocolError::Deserialization(err.to_string())
        } else {
            ProtocolError::Serialization(err.to_string())
        }
    }
}
