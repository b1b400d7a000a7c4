//! # OFS Protocol Library
//!
//! Wire types and the JSON codec for the OFS hierarchical storage service.
//!
//! ## Overview
//!
//! The OFS server speaks a request/response protocol with exactly one JSON
//! object in each direction per TCP connection. This crate provides:
//!
//! - **Message Definitions**: operations, the request envelope, the raw
//!   response, and typed views of response data (directory entries,
//!   storage statistics, user summaries)
//! - **Codec**: encoding requests and decoding responses into a tagged
//!   [`ResponseResult`] that never carries a parse fault to the caller
//! - **Errors**: [`ProtocolError`] for callers that want the fault itself
//!
//! This crate performs no I/O.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{DirectoryEntry, JsonCodec, Operation};
//! use serde_json::json;
//!
//! let codec = JsonCodec::new();
//! let mut parameters = serde_json::Map::new();
//! parameters.insert("path".to_string(), json!("/docs"));
//! let request = codec.encode(Operation::DirList, parameters, Some("sess_alice_1")).unwrap();
//! assert!(!request.is_empty());
//!
//! let reply = br#"{"status":"success","data":{"files":[{"name":"a.txt","type":"file","size":10}]}}"#;
//! let files: Vec<DirectoryEntry> = codec.decode(reply).field("files").unwrap();
//! assert_eq!(files[0].size, Some(10));
//! ```

pub mod codec;
pub mod error;
pub mod messages;

pub use codec::{JsonCodec, RequestIdStrategy, DEFAULT_REQUEST_ID};
pub use error::{ProtocolError, Result};
pub use messages::{
    extract_field, DirectoryEntry, EntryKind, Failure, JsonObject, Operation, RequestEnvelope,
    ResponseResult, StorageStats, UserSummary, WireResponse,
};
