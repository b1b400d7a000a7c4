//! Authentication state for the client.
//!
//! A [`Session`] is either fully unauthenticated or carries a token, an
//! identity, and a privilege flag together. The only constructor for the
//! authenticated form is [`Session::establish`], so a half-populated session
//! cannot exist.

/// Identity that has historically been treated as privileged.
pub const DEFAULT_PRIVILEGED_IDENTITY: &str = "admin";

/// Lifecycle phase visible to callers of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No token is held.
    Unauthenticated,
    /// A token from a successful login is held.
    Authenticated,
}

/// Decides whether an identity is privileged.
///
/// The server does not yet report roles at login, so this compares the
/// identity against a configured name. `None` turns the check off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegePolicy {
    privileged_identity: Option<String>,
}

impl Default for PrivilegePolicy {
    fn default() -> Self {
        Self {
            privileged_identity: Some(DEFAULT_PRIVILEGED_IDENTITY.to_string()),
        }
    }
}

impl PrivilegePolicy {
    /// Treat `identity` as privileged.
    pub fn identity(identity: impl Into<String>) -> Self {
        Self {
            privileged_identity: Some(identity.into()),
        }
    }

    /// Never treat anyone as privileged.
    pub fn disabled() -> Self {
        Self {
            privileged_identity: None,
        }
    }

    /// Whether `identity` is privileged under this policy.
    pub fn is_privileged(&self, identity: &str) -> bool {
        self.privileged_identity.as_deref() == Some(identity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    token: String,
    identity: String,
    privileged: bool,
}

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    /// An unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// An authenticated session for `identity` holding `token`.
    pub fn establish(
        token: impl Into<String>,
        identity: impl Into<String>,
        policy: &PrivilegePolicy,
    ) -> Self {
        let identity = identity.into();
        let privileged = policy.is_privileged(&identity);
        Self {
            credentials: Some(Credentials {
                token: token.into(),
                identity,
                privileged,
            }),
        }
    }

    /// Forget the token, identity, and privilege flag.
    pub fn clear(&mut self) {
        self.credentials = None;
    }

    /// Whether a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// The lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    /// The session token, attached to every request after login.
    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    /// The logged-in identity.
    pub fn identity(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.identity.as_str())
    }

    /// Whether the logged-in identity is privileged. False when logged out.
    pub fn is_privileged(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| c.privileged)
    }
}
