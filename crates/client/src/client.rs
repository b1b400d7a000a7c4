//! The operation façade used by presentation code.
//!
//! [`OfsClient`] is the single surface a user interface talks to. It owns
//! the session and navigation state, turns each user intent into one
//! request (two for a recovered listing), and hands back plain values or a
//! [`Failure`] to display. Transport faults, undecodable responses, and
//! server-side errors all arrive as `Failure`; nothing here panics or
//! returns a different error type.
//!
//! Every intent takes `&mut self`, so two intents can never interleave their
//! state changes.

use protocol::{
    DirectoryEntry, EntryKind, Failure, JsonCodec, JsonObject, Operation, RequestIdStrategy,
    ResponseResult, StorageStats, UserSummary,
};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::navigator::{validate_name, Navigator};
use crate::recovery::RecoveryPolicy;
use crate::session::{PrivilegePolicy, Session, SessionPhase};
use crate::transport::{TcpTransport, Transport};

/// Result of a façade intent.
pub type Outcome<T> = Result<T, Failure>;

/// Message returned when an intent needs a session and there is none.
pub const NOT_LOGGED_IN: &str = "not logged in";

/// Policies that shape client behaviour, independent of the transport.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Which identity counts as privileged.
    pub privilege: PrivilegePolicy,
    /// When a failed listing resets to the root.
    pub recovery: RecoveryPolicy,
    /// How correlation ids are generated.
    pub request_ids: RequestIdStrategy,
}

/// Session-aware client for an OFS server.
#[derive(Debug)]
pub struct OfsClient<T = TcpTransport> {
    transport: T,
    codec: JsonCodec,
    session: Session,
    navigator: Navigator,
    privilege: PrivilegePolicy,
    recovery: RecoveryPolicy,
}

impl OfsClient<TcpTransport> {
    /// Create a TCP client from loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.transport(), config.client_options())
    }
}

fn parameters<const N: usize>(pairs: [(&str, Value); N]) -> JsonObject {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn invalid_name(err: impl std::fmt::Display) -> Failure {
    Failure::new(format!("invalid name: {err}"))
}

impl<T: Transport> OfsClient<T> {
    /// Create a logged-out client positioned at the root.
    pub fn new(transport: T, options: ClientOptions) -> Self {
        Self {
            transport,
            codec: JsonCodec::with_request_ids(options.request_ids),
            session: Session::new(),
            navigator: Navigator::new(),
            privilege: options.privilege,
            recovery: options.recovery,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current authentication state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the client is logged in.
    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// The directory the client is positioned in.
    pub fn current_path(&self) -> &str {
        self.navigator.current_path()
    }

    /// Log in as `username`.
    ///
    /// Any existing session is dropped first, so a failed attempt always
    /// leaves the client logged out at the root. On success the token,
    /// identity, and privilege flag are installed together.
    pub async fn login(&mut self, username: &str, password: &str) -> Outcome<()> {
        self.reset_local_state();

        if username.is_empty() {
            return Err(Failure::new("username must not be empty"));
        }

        let result = self
            .call(
                Operation::UserLogin,
                parameters([
                    ("username", Value::from(username)),
                    ("password", Value::from(password)),
                ]),
            )
            .await;

        let token = result
            .field::<String>("session_id")
            .and_then(|token| {
                if token.is_empty() {
                    Err(Failure::malformed("empty session_id"))
                } else {
                    Ok(token)
                }
            });
        let token = match token {
            Ok(token) => token,
            Err(failure) => {
                tracing::info!("Login failed for {}: {}", username, failure);
                return Err(failure);
            }
        };

        self.session = Session::establish(token, username, &self.privilege);
        self.navigator.reset();
        tracing::info!(
            "Logged in as {} (privileged: {})",
            username,
            self.session.is_privileged()
        );
        Ok(())
    }

    /// Log out locally. No request is sent.
    pub fn logout(&mut self) {
        if let Some(identity) = self.session.identity() {
            tracing::info!("Logging out {}", identity);
        }
        self.reset_local_state();
    }

    /// List the current directory.
    ///
    /// If the server says the directory is gone, navigation returns to the
    /// root and the listing is retried once. A second failure is returned
    /// as is.
    pub async fn list(&mut self) -> Outcome<Vec<DirectoryEntry>> {
        let mut result = self.request_listing().await?;

        if self.recovery.should_reset(&result) {
            tracing::warn!(
                "Directory {} no longer exists; returning to root",
                self.navigator.current_path()
            );
            self.navigator.reset();
            result = self.request_listing().await?;
        }

        result.field("files")
    }

    /// Enter `entry`, which must be a directory from the latest listing, and
    /// list it.
    pub async fn navigate_into(&mut self, entry: &DirectoryEntry) -> Outcome<Vec<DirectoryEntry>> {
        self.ensure_authenticated()?;
        if !entry.is_directory() {
            return Err(Failure::new(format!("not a directory: {}", entry.name)));
        }
        self.navigator.descend_into(&entry.name).map_err(invalid_name)?;
        self.list().await
    }

    /// Go to the parent directory and list it.
    pub async fn navigate_up(&mut self) -> Outcome<Vec<DirectoryEntry>> {
        self.ensure_authenticated()?;
        self.navigator.ascend();
        self.list().await
    }

    /// Go to the root and list it.
    pub async fn navigate_root(&mut self) -> Outcome<Vec<DirectoryEntry>> {
        self.ensure_authenticated()?;
        self.navigator.reset();
        self.list().await
    }

    /// Create a file named `name` in the current directory.
    pub async fn create_file(&mut self, name: &str, content: &str) -> Outcome<()> {
        self.create(name, EntryKind::File, content).await
    }

    /// Create a directory named `name` in the current directory.
    pub async fn create_directory(&mut self, name: &str) -> Outcome<()> {
        self.create(name, EntryKind::Directory, "").await
    }

    /// Delete `entry` from the current directory.
    pub async fn delete(&mut self, entry: &DirectoryEntry) -> Outcome<()> {
        validate_name(&entry.name).map_err(invalid_name)?;
        let operation = match entry.kind {
            EntryKind::Directory => Operation::DirDelete,
            EntryKind::File => Operation::FileDelete,
        };
        let path = self.navigator.resolve_child_path(&entry.name);
        self.call(operation, parameters([("path", Value::from(path))]))
            .await
            .into_result()
            .map(drop)
    }

    /// Read the content of file `name` in the current directory.
    pub async fn read_file(&mut self, name: &str) -> Outcome<String> {
        validate_name(name).map_err(invalid_name)?;
        let path = self.navigator.resolve_child_path(name);
        self.call(Operation::FileRead, parameters([("path", Value::from(path))]))
            .await
            .field("content")
    }

    /// Create a user account.
    pub async fn create_user(&mut self, username: &str, password: &str) -> Outcome<()> {
        if username.is_empty() || password.is_empty() {
            return Err(Failure::new("username and password must not be empty"));
        }
        self.call(
            Operation::UserCreate,
            parameters([
                ("username", Value::from(username)),
                ("password", Value::from(password)),
            ]),
        )
        .await
        .into_result()
        .map(drop)
    }

    /// Delete a user account.
    pub async fn delete_user(&mut self, username: &str) -> Outcome<()> {
        if username.is_empty() {
            return Err(Failure::new("username must not be empty"));
        }
        self.call(
            Operation::UserDelete,
            parameters([("username", Value::from(username))]),
        )
        .await
        .into_result()
        .map(drop)
    }

    /// List user accounts.
    pub async fn list_users(&mut self) -> Outcome<Vec<UserSummary>> {
        self.call(Operation::UserList, JsonObject::new())
            .await
            .field("users")
    }

    /// Fetch storage statistics.
    pub async fn stats(&mut self) -> Outcome<StorageStats> {
        self.call(Operation::GetStats, JsonObject::new())
            .await
            .field("stats")
    }

    async fn create(&mut self, name: &str, kind: EntryKind, content: &str) -> Outcome<()> {
        validate_name(name).map_err(invalid_name)?;
        let path = self.navigator.resolve_child_path(name);
        self.call(
            Operation::FileCreate,
            parameters([
                ("path", Value::from(path)),
                ("type", Value::from(kind.as_str())),
                ("data", Value::from(content)),
            ]),
        )
        .await
        .into_result()
        .map(drop)
    }

    fn reset_local_state(&mut self) {
        self.session.clear();
        self.navigator.reset();
    }

    fn ensure_authenticated(&self) -> Outcome<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(Failure::new(NOT_LOGGED_IN))
        }
    }

    async fn request_listing(&self) -> Outcome<ResponseResult> {
        self.exchange(Operation::DirList, self.navigator.listing_parameters())
            .await
    }

    /// Send one request, folding local and transport failures into the result.
    async fn call(&self, operation: Operation, parameters: JsonObject) -> ResponseResult {
        self.exchange(operation, parameters)
            .await
            .unwrap_or_else(ResponseResult::Failure)
    }

    /// Send one request.
    ///
    /// `Err` means the request never produced a server reply: it was refused
    /// locally, could not be encoded, or the transport failed. `Ok` carries
    /// whatever the server said, including errors and undecodable replies.
    async fn exchange(
        &self,
        operation: Operation,
        parameters: JsonObject,
    ) -> Outcome<ResponseResult> {
        let token = self.session.token();
        if operation.requires_session() && token.is_none() {
            tracing::debug!("Refusing {} while logged out", operation);
            return Err(Failure::new(NOT_LOGGED_IN));
        }

        let request = self
            .codec
            .encode(operation, parameters, token)
            .map_err(|e| Failure::new(e.to_string()))?;

        tracing::debug!(
            "Sending {} (authenticated: {})",
            operation,
            token.is_some()
        );

        match self.transport.exchange(&request).await {
            Ok(response) => Ok(self.codec.decode(&response)),
            Err(e) => {
                tracing::warn!("{} failed in transport: {}", operation, e);
                Err(Failure::new(e.to_string()))
            }
        }
    }
}
