//! # OFS Client Library
//!
//! Client core for the OFS hierarchical storage service.
//!
//! ## Overview
//!
//! The client sits between a presentation layer and an OFS server. It
//! provides:
//!
//! - **Transport**: one TCP connection per request with timeout-bounded
//!   connect, send, and receive
//! - **Session State**: token, identity, and privilege flag, installed and
//!   cleared together
//! - **Navigation**: the current remote directory and path joining
//! - **Recovery**: returning to the root when a listed directory vanished
//! - **Operation Façade**: one method per user intent, each returning a value
//!   or a displayable failure
//! - **Shell**: a line-oriented front end used by the `ofs` binary
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Shell / any UI                 │
//! ├─────────────────────────────────────────────┤
//! │                 OfsClient                   │
//! │  ┌──────────┐ ┌───────────┐ ┌────────────┐  │
//! │  │ Session  │ │ Navigator │ │  Recovery  │  │
//! │  └──────────┘ └───────────┘ └────────────┘  │
//! ├─────────────────────────────────────────────┤
//! │      protocol::JsonCodec  +  Transport      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ofs_client::{ClientConfig, OfsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load_default()?;
//!     let mut client = OfsClient::from_config(&config);
//!
//!     if let Err(failure) = client.login("alice", "secret").await {
//!         eprintln!("login failed: {failure}");
//!         return Ok(());
//!     }
//!
//!     for entry in client.list().await.unwrap_or_default() {
//!         println!("{}", entry.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`transport`]: Request/response exchange over TCP
//! - [`session`]: Authentication state and privilege policy
//! - [`navigator`]: Current directory and path helpers
//! - [`recovery`]: Missing-directory classification
//! - [`client`]: The operation façade
//! - [`config`]: Configuration loading and defaults
//! - [`shell`]: Interactive command shell

pub mod client;
pub mod config;
pub mod navigator;
pub mod recovery;
pub mod session;
pub mod shell;
pub mod transport;

// Re-export protocol for convenience
pub use protocol;

pub use client::{ClientOptions, OfsClient, Outcome, NOT_LOGGED_IN};
pub use config::{ClientConfig, ConfigError};
pub use navigator::{NavigationError, Navigator, ROOT};
pub use recovery::{FailureClass, RecoveryPolicy};
pub use session::{PrivilegePolicy, Session, SessionPhase};
pub use shell::{Command, Shell, Step};
pub use transport::{TcpTransport, Transport, TransportError};

pub use protocol::{DirectoryEntry, EntryKind, Failure, StorageStats, UserSummary};
