// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Argument Validation
//!
//! Validates CLI argument values before they reach application logic: length
//! limits, dangerous-pattern detection (path traversal, shell metacharacters),
//! protected-system-directory checks, and path canonicalization.
//!
//! This module is deliberately domain-agnostic - it validates *values*
//! (paths, numbers, argument strings), not the merge-domain CLI's structure.
//! `parser.rs` owns the clap-derived `Cli`/`Commands` shape; this module is
//! the toolkit its `validate_cli()` calls into.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of CLI arguments accepted.
const MAX_ARG_COUNT: usize = 100;
/// Maximum length of a single argument value.
const MAX_ARG_LENGTH: usize = 1000;
/// Maximum length of a canonicalized path.
const MAX_PATH_LENGTH: usize = 4096;

/// Substrings that are never allowed in an argument value, regardless of
/// position - path traversal and shell metacharacters.
const DANGEROUS_PATTERNS: &[&str] = &["..", "~", "$", "`", ";", "&", "|", ">", "<", "\n", "\r", "\0"];

/// Directories a merge job must never be pointed at as an input or output
/// root.
const PROTECTED_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/boot", "/sys", "/proc", "/dev"];

/// Errors produced while validating CLI argument values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("too many arguments (max {MAX_ARG_COUNT})")]
    TooManyArguments,

    #[error("argument too long: {0}")]
    ArgumentTooLong(String),

    #[error("dangerous pattern '{pattern}' found in argument: {arg}")]
    DangerousPattern { pattern: String, arg: String },

    #[error("path exceeds maximum length ({MAX_PATH_LENGTH})")]
    PathTooLong,

    #[error("path resolves into a protected system directory: {0}")]
    ProtectedDirectory(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("invalid value for {arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// Validates raw CLI argument values before they're trusted by application
/// logic.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validate the overall argument count.
    pub fn validate_argument_count(args: &[String]) -> Result<(), ParseError> {
        if args.len() > MAX_ARG_COUNT {
            return Err(ParseError::TooManyArguments);
        }
        Ok(())
    }

    /// Validate a single argument string: length and dangerous patterns.
    pub fn validate_argument(arg: &str) -> Result<(), ParseError> {
        if arg.len() > MAX_ARG_LENGTH {
            return Err(ParseError::ArgumentTooLong(arg.to_string()));
        }

        for pattern in DANGEROUS_PATTERNS {
            if arg.contains(pattern) {
                return Err(ParseError::DangerousPattern {
                    pattern: pattern.to_string(),
                    arg: arg.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validate and canonicalize a path argument that must already exist.
    pub fn validate_path(arg: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(arg)?;

        let path = Path::new(arg);
        let canonical = path
            .canonicalize()
            .map_err(|_| ParseError::PathNotFound(arg.to_string()))?;

        let canonical_str = canonical.to_string_lossy();
        if canonical_str.len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if canonical_str.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(canonical_str.to_string()));
            }
        }

        Ok(canonical)
    }

    /// Validate an optional path argument (e.g. an output directory that
    /// might not exist yet): skips the existence check, still rejects
    /// dangerous patterns and protected directories.
    pub fn validate_optional_path(arg: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(arg)?;

        let path = PathBuf::from(arg);
        let probe = path.to_string_lossy();
        if probe.len() > MAX_PATH_LENGTH {
            return Err(ParseError::PathTooLong);
        }

        for protected in PROTECTED_DIRS {
            if probe.starts_with(protected) {
                return Err(ParseError::ProtectedDirectory(probe.to_string()));
            }
        }

        Ok(path)
    }

    /// Validate that a numeric argument parses and falls within `[min, max]`.
    pub fn validate_number<T>(arg_name: &str, value: &str, min: T, max: T) -> Result<T, ParseError>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    {
        let parsed = value.parse::<T>().map_err(|_| ParseError::InvalidValue {
            arg: arg_name.to_string(),
            reason: format!("'{}' is not a valid number", value),
        })?;

        if parsed < min || parsed > max {
            return Err(ParseError::InvalidValue {
                arg: arg_name.to_string(),
                reason: format!("must be between {} and {}", min, max),
            });
        }

        Ok(parsed)
    }
}
