// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Bootstrap Pipeline
//!
//! Three-stage pipeline turning `std::env::args()` into a validated,
//! domain-safe command:
//!
//! 1. `parser::parse()` - parse raw CLI with clap
//! 2. `validator::SecureArgParser` - reject dangerous paths/values
//! 3. `ValidatedCli`/`ValidatedCommand` - the safe, validated result callers
//!    act on
//!
//! Nothing downstream of `parse_and_validate` ever sees an unvalidated path
//! or raw argument string.

pub mod parser;
pub mod validator;

use std::path::PathBuf;

use parser::{Cli, Commands};
use validator::SecureArgParser;

pub use validator::ParseError;

/// A fully parsed and security-validated CLI invocation.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// The validated form of [`parser::Commands`] - every path has been
/// canonicalized (or checked safe, for paths that need not yet exist) and
/// every number has been range-checked.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Merge {
        inputs: Vec<PathBuf>,
        output: PathBuf,
        temp_dir: Option<PathBuf>,
        max_memory_mb: Option<u64>,
        chunk_size: Option<usize>,
        concurrent_workers: Option<usize>,
        use_streaming: bool,
        optimize_memory: bool,
    },
    Validate {
        config: PathBuf,
    },
}

/// Parse `std::env::args()` with clap and run every argument through
/// [`validator::SecureArgParser`].
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    use clap::Parser;
    let cli = Cli::parse();
    validate_cli(cli)
}

/// Validate an already-parsed [`Cli`] against [`SecureArgParser`]'s rules.
pub fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = cli.config.as_deref().map(path_to_str).transpose()?.map(PathBuf::from);

    let command = match cli.command {
        Commands::Merge {
            inputs,
            output,
            temp_dir,
            max_memory_mb,
            chunk_size,
            concurrent_workers,
            no_streaming,
            optimize_memory,
        } => {
            if inputs.is_empty() {
                return Err(ParseError::MissingArgument("inputs".to_string()));
            }

            let validated_inputs = inputs
                .iter()
                .map(|p| SecureArgParser::validate_path(&path_to_str(p)?))
                .collect::<Result<Vec<_>, _>>()?;

            let validated_output = SecureArgParser::validate_optional_path(&path_to_str(&output)?)?;

            let validated_temp_dir = temp_dir
                .as_deref()
                .map(path_to_str)
                .transpose()?
                .map(|s| SecureArgParser::validate_optional_path(&s))
                .transpose()?;

            if let Some(chunk_size) = chunk_size {
                SecureArgParser::validate_number("chunk-size", &chunk_size.to_string(), 1usize, 10_000)?;
            }
            if let Some(workers) = concurrent_workers {
                SecureArgParser::validate_number("concurrent-workers", &workers.to_string(), 1usize, 1024)?;
            }
            if let Some(max_memory_mb) = max_memory_mb {
                SecureArgParser::validate_number("max-memory-mb", &max_memory_mb.to_string(), 1u64, 1_000_000)?;
            }

            ValidatedCommand::Merge {
                inputs: validated_inputs,
                output: validated_output,
                temp_dir: validated_temp_dir,
                max_memory_mb,
                chunk_size,
                concurrent_workers,
                use_streaming: !no_streaming,
                optimize_memory,
            }
        }
        Commands::Validate { config } => {
            let validated = SecureArgParser::validate_path(&path_to_str(&config)?)?;
            ValidatedCommand::Validate { config: validated }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose, config })
}

fn path_to_str(path: &std::path::Path) -> Result<String, ParseError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| ParseError::InvalidPath(path.to_string_lossy().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn rejects_merge_with_no_inputs() {
        // clap itself requires at least one positional `inputs` value, so
        // construct the Commands variant directly to exercise the empty-check.
        let cli = Cli {
            command: Commands::Merge {
                inputs: vec![],
                output: PathBuf::from("out.pdf"),
                temp_dir: None,
                max_memory_mb: None,
                chunk_size: None,
                concurrent_workers: None,
                no_streaming: false,
                optimize_memory: false,
            },
            verbose: false,
            config: None,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::MissingArgument(_))));
    }

    #[test]
    fn rejects_merge_with_nonexistent_input() {
        let cli = Cli::parse_from(["merge", "merge", "/no/such/file.pdf", "--output", "/tmp/out.pdf"]);
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn rejects_out_of_range_chunk_size() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let input_path = tmp.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from([
            "merge",
            "merge",
            &input_path,
            "--output",
            "/tmp/out.pdf",
            "--chunk-size",
            "999999",
        ]);
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn accepts_validate_with_existing_config_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config_path = tmp.path().to_str().unwrap().to_string();
        let cli = Cli::parse_from(["merge", "validate", &config_path]);
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Validate { .. }));
    }
}
