//! Protocol message definitions for OFS.
//!
//! Requests and responses are single JSON objects, one per TCP connection.
//! This module defines the envelope types that travel on the wire and the
//! typed views the client derives from response data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{ProtocolError, Result};

/// Parameter or data object carried inside an envelope.
pub type JsonObject = Map<String, Value>;

/// Operations understood by the OFS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Authenticate and obtain a session token.
    UserLogin,
    /// Create a user account and its home directory.
    UserCreate,
    /// List registered users.
    UserList,
    /// Remove a user account.
    UserDelete,
    /// List the entries of a directory.
    DirList,
    /// Create a file or directory (`type` selects which).
    FileCreate,
    /// Read the content of a file.
    FileRead,
    /// Delete a file.
    FileDelete,
    /// Delete an empty directory.
    DirDelete,
    /// Fetch storage usage counters.
    GetStats,
}

impl Operation {
    /// The operation name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::UserLogin => "user_login",
            Operation::UserCreate => "user_create",
            Operation::UserList => "user_list",
            Operation::UserDelete => "user_delete",
            Operation::DirList => "dir_list",
            Operation::FileCreate => "file_create",
            Operation::FileRead => "file_read",
            Operation::FileDelete => "file_delete",
            Operation::DirDelete => "dir_delete",
            Operation::GetStats => "get_stats",
        }
    }

    /// Whether the operation may only be sent with a session token.
    pub fn requires_session(self) -> bool {
        !matches!(self, Operation::UserLogin)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as it is written to the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Operation to perform.
    pub operation: Operation,
    /// Correlation identifier echoed by some server replies.
    pub request_id: String,
    /// Operation-specific parameters.
    pub parameters: JsonObject,
    /// Session token, present only when authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A response exactly as read from the connection.
///
/// Every field is optional here; interpretation happens in
/// [`ResponseResult::from_wire`]. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    /// `"success"` or `"error"`.
    #[serde(default)]
    pub status: Option<String>,
    /// Operation-specific payload on success.
    #[serde(default)]
    pub data: Option<JsonObject>,
    /// Human-readable message on error.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Optional numeric error code.
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// A failed request, whatever layer it failed in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Failure {
    /// Description suitable for display.
    pub message: String,
    /// Numeric code from the server, when it sent one.
    pub code: Option<i64>,
}

impl Failure {
    /// A failure with a message and no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// A failure describing a response that could not be interpreted.
    pub fn malformed(detail: impl std::fmt::Display) -> Self {
        Self::new(format!("malformed response: {detail}"))
    }
}

/// Tagged outcome of a single request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseResult {
    /// The server accepted the request.
    Success {
        /// Operation-specific payload (empty when the server sent none).
        data: JsonObject,
    },
    /// The request failed in transport, decoding, or on the server.
    Failure(Failure),
}

impl ResponseResult {
    /// Interpret a parsed wire response.
    pub fn from_wire(wire: WireResponse) -> Result<Self> {
        match wire.status.as_deref() {
            Some("success") => Ok(ResponseResult::Success {
                data: wire.data.unwrap_or_default(),
            }),
            Some("error") => Ok(ResponseResult::Failure(Failure {
                message: wire
                    .error_message
                    .unwrap_or_else(|| "unknown server error".to_string()),
                code: wire.error_code,
            })),
            Some(other) => Err(ProtocolError::UnknownStatus(other.to_string())),
            None => Err(ProtocolError::MissingStatus),
        }
    }

    /// Shorthand for a failure without a code.
    pub fn failure(message: impl Into<String>) -> Self {
        ResponseResult::Failure(Failure::new(message))
    }

    /// Whether this is a `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseResult::Success { .. })
    }

    /// The failure, if this is one.
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            ResponseResult::Failure(failure) => Some(failure),
            ResponseResult::Success { .. } => None,
        }
    }

    /// Convert into a standard `Result` over the data object.
    pub fn into_result(self) -> std::result::Result<JsonObject, Failure> {
        match self {
            ResponseResult::Success { data } => Ok(data),
            ResponseResult::Failure(failure) => Err(failure),
        }
    }

    /// Extract and deserialize a named field of the success data.
    ///
    /// A failure is passed through; a missing or mistyped field becomes a
    /// "malformed response" failure.
    pub fn field<T: DeserializeOwned>(self, name: &str) -> std::result::Result<T, Failure> {
        let data = self.into_result()?;
        extract_field(&data, name).map_err(Failure::malformed)
    }
}

/// Deserialize `name` out of a data object.
pub fn extract_field<T: DeserializeOwned>(data: &JsonObject, name: &str) -> Result<T> {
    let value = data
        .get(name)
        .ok_or_else(|| ProtocolError::MissingField(name.to_string()))?;
    Ok(T::deserialize(value)?)
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    #[serde(rename = "file")]
    File,
    /// Directory.
    #[serde(rename = "dir", alias = "directory")]
    Directory,
}

impl EntryKind {
    /// The wire spelling, also used for the `type` parameter of `file_create`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "dir",
        }
    }
}

/// One entry of a `dir_list` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireEntry")]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes; only ever set for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl DirectoryEntry {
    /// A file entry.
    pub fn file(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    /// A directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: None,
        }
    }

    /// Whether the entry is a directory.
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Deserialize)]
struct WireEntry {
    name: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(default)]
    size: Option<u64>,
}

impl From<WireEntry> for DirectoryEntry {
    fn from(wire: WireEntry) -> Self {
        let size = match wire.kind {
            EntryKind::File => wire.size,
            EntryKind::Directory => None,
        };
        Self {
            name: wire.name,
            kind: wire.kind,
            size,
        }
    }
}

/// Storage usage counters from `get_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Capacity of the backing store in bytes.
    pub total_size: u64,
    /// Bytes in allocated blocks.
    pub used_space: u64,
    /// Bytes in free blocks.
    pub free_space: u64,
    /// Number of files.
    pub total_files: u64,
    /// Number of directories, excluding the root.
    pub total_directories: u64,
}

/// One account from `user_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Account name.
    pub username: String,
    /// `"admin"` or `"user"`.
    pub role: String,
}

impl UserSummary {
    /// Whether the server reports this account as an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
