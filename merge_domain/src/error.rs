// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Error Taxonomy
//!
//! A single error type spans the domain and its infrastructure callers. Each
//! variant corresponds to one of the semantic kinds the engine must branch on:
//! per-input validation failures that only skip a file, versus engine-level
//! failures that terminate the job.
//!
//! Retry eligibility, "does this kill the job", and structured-log category are
//! all derivable from the variant alone via the methods below, so callers never
//! need to match on the enum just to classify it.

use thiserror::Error;

/// Errors produced anywhere in the merge engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// No inputs were supplied, or none survived validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A single input failed structural validation. Causes that input to be
    /// skipped, not the job to fail.
    #[error("invalid file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    /// A single input is corrupted beyond recovery. Skipped, not fatal.
    #[error("corrupted file {path}: {reason}")]
    Corrupted { path: String, reason: String },

    /// A single input is password-protected. Skipped, not fatal.
    #[error("encrypted file {path}")]
    Encrypted { path: String },

    /// Output directory is not writable. Fatal, checked before any work
    /// starts.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Transient filesystem error. Retryable by the atomic writer.
    #[error("io error: {0}")]
    Io(String),

    /// Backend-internal failure. Retryable by the atomic writer.
    #[error("processing failed: {0}")]
    Processing(String),

    /// A chunk merge exceeded its deadline. Terminal for the job.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The cancellation token fired. Terminal.
    #[error("cancelled")]
    Cancelled,

    /// Configuration could not be parsed or was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Anything else that should never happen in a correctly wired engine.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl MergeError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFile { path: path.into(), reason: reason.into() }
    }

    pub fn corrupted(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted { path: path.into(), reason: reason.into() }
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Whether the atomic writer's retry loop should retry this error class.
    /// Per the retry policy: only `Io` and `Processing` are retryable; every
    /// other class (Permission, InvalidInput, Corrupted, ...) gets exactly one
    /// attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Processing(_))
    }

    /// Whether this error terminates the whole job rather than just skipping
    /// one input.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::Permission(_)
                | Self::Timeout(_)
                | Self::Cancelled
                | Self::InvalidConfiguration(_)
                | Self::InternalError(_)
        )
    }

    /// A stable label for structured log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidFile { .. } => "invalid_file",
            Self::Corrupted { .. } => "corrupted",
            Self::Encrypted { .. } => "encrypted",
            Self::Permission(_) => "permission",
            Self::Io(_) => "io",
            Self::Processing(_) => "processing",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::InternalError(_) => "internal",
        }
    }
}

// I/O is a first-class domain concern here: the engine's entire job is moving
// files around, so a bare `From<std::io::Error>` lives in the domain crate
// rather than behind an infrastructure adapter.
impl From<std::io::Error> for MergeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::Permission(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_processing_are_recoverable() {
        assert!(MergeError::io("disk full").is_recoverable());
        assert!(MergeError::processing("backend crashed").is_recoverable());
    }

    #[test]
    fn fatal_classes_are_not_recoverable() {
        assert!(!MergeError::permission("readonly").is_recoverable());
        assert!(!MergeError::invalid_input("empty").is_recoverable());
        assert!(!MergeError::corrupted("a.pdf", "bad xref").is_recoverable());
    }

    #[test]
    fn terminal_classification_matches_job_semantics() {
        assert!(MergeError::invalid_input("empty").is_terminal());
        assert!(MergeError::permission("readonly").is_terminal());
        assert!(MergeError::Cancelled.is_terminal());
        assert!(!MergeError::corrupted("a.pdf", "bad xref").is_terminal());
        assert!(!MergeError::Encrypted { path: "a.pdf".into() }.is_terminal());
    }

    #[test]
    fn io_error_permission_denied_maps_to_permission_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let merge_err: MergeError = io_err.into();
        assert!(matches!(merge_err, MergeError::Permission(_)));
    }

    #[test]
    fn category_labels_are_stable() {
        assert_eq!(MergeError::Cancelled.category(), "cancelled");
        assert_eq!(MergeError::io("x").category(), "io");
    }
}
