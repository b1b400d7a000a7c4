//! Current-directory tracking for the remote tree.
//!
//! Paths are absolute and slash-delimited. A path held by the [`Navigator`]
//! always starts with `/`, never contains `//`, and never ends with `/`
//! unless it is the root itself.

use protocol::JsonObject;
use serde_json::Value;
use thiserror::Error;

/// The root of the remote tree.
pub const ROOT: &str = "/";

const SEPARATOR: char = '/';

/// Errors for names that cannot be used as a single path component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// The name was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// The name contained a path separator.
    #[error("name must not contain '/': {0}")]
    ContainsSeparator(String),

    /// The name was `.` or `..`.
    #[error("name is reserved: {0}")]
    Reserved(String),
}

/// Check that `name` is usable as one component of a path.
pub fn validate_name(name: &str) -> Result<(), NavigationError> {
    if name.is_empty() {
        return Err(NavigationError::EmptyName);
    }
    if name.contains(SEPARATOR) {
        return Err(NavigationError::ContainsSeparator(name.to_string()));
    }
    if name == "." || name == ".." {
        return Err(NavigationError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Bring `path` into canonical form: leading `/`, no repeated separators,
/// no trailing separator except for the root.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
        normalized.push(SEPARATOR);
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push(SEPARATOR);
    }
    normalized
}

/// Join `name` onto `base` with exactly one separator between them.
pub fn join_path(base: &str, name: &str) -> String {
    normalize_path(&format!("{base}{SEPARATOR}{name}"))
}

/// Holds the directory the client is positioned in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    current: String,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            current: ROOT.to_string(),
        }
    }
}

impl Navigator {
    /// A navigator positioned at the root.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current directory.
    pub fn current_path(&self) -> &str {
        &self.current
    }

    /// Whether the current directory is the root.
    pub fn is_at_root(&self) -> bool {
        self.current == ROOT
    }

    /// Move into the child directory `name`.
    ///
    /// The caller must already know `name` is a directory; the navigator only
    /// checks that it is a single path component.
    pub fn descend_into(&mut self, name: &str) -> Result<(), NavigationError> {
        validate_name(name)?;
        self.current = join_path(&self.current, name);
        Ok(())
    }

    /// Move to the parent directory. Returns `false` if already at the root.
    pub fn ascend(&mut self) -> bool {
        if self.is_at_root() {
            return false;
        }
        match self.current.rfind(SEPARATOR) {
            Some(0) | None => self.current = ROOT.to_string(),
            Some(idx) => self.current.truncate(idx),
        }
        true
    }

    /// Return to the root.
    pub fn reset(&mut self) {
        self.current = ROOT.to_string();
    }

    /// The full path of `name` inside the current directory.
    pub fn resolve_child_path(&self, name: &str) -> String {
        join_path(&self.current, name)
    }

    /// Parameters of a `dir_list` request for the current directory.
    pub fn listing_parameters(&self) -> JsonObject {
        let mut parameters = JsonObject::new();
        parameters.insert("path".to_string(), Value::String(self.current.clone()));
        parameters
    }
}
