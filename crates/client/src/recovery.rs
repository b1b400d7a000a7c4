//! Classification of failed directory listings.
//!
//! The server reports a vanished directory only through its error text, so a
//! listing failure is treated as "path missing" when the message contains a
//! marker phrase, compared case-insensitively. This is a compatibility shim
//! for the current protocol; a structured error code would replace it.

use protocol::{Failure, ResponseResult};

/// Phrase that marks a missing-path error.
pub const DEFAULT_NOT_FOUND_MARKER: &str = "not found";

/// What kind of failure a listing hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The listed directory no longer exists; resetting to the root helps.
    MissingPath,
    /// Anything else, surfaced to the caller unchanged.
    Other,
}

/// Decides when a failed listing should reset navigation and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    marker: String,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::with_marker(DEFAULT_NOT_FOUND_MARKER)
    }
}

impl RecoveryPolicy {
    /// Use `marker` instead of [`DEFAULT_NOT_FOUND_MARKER`].
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    /// The lowercase marker phrase.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classify a failure.
    pub fn classify(&self, failure: &Failure) -> FailureClass {
        if !self.marker.is_empty() && failure.message.to_lowercase().contains(&self.marker) {
            FailureClass::MissingPath
        } else {
            FailureClass::Other
        }
    }

    /// Whether `result` is a failure that calls for a reset to the root.
    pub fn should_reset(&self, result: &ResponseResult) -> bool {
        result
            .as_failure()
            .is_some_and(|failure| self.classify(failure) == FailureClass::MissingPath)
    }
}
