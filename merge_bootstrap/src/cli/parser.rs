// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! The clap-derived command-line surface. Parsing only - argument *values*
//! are trusted only after `validator::SecureArgParser` has been run over them
//! in `super::validate_cli`.
//!
//! The merge engine's service façade is a minor, demonstrative piece of this
//! crate rather than its focus: one `Merge` command covering the knobs a
//! `MergeJobOptions` exposes, plus `Validate` to check a `merge_engine.toml`
//! without running a job.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "merge")]
#[command(about = "Streaming PDF merge engine - adaptive strategy selection, atomic output replacement")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (defaults to discovering merge_engine.toml in
    /// the current or a parent directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge a list of PDF documents into one output file
    Merge {
        /// Input PDF paths, in the order they should appear in the output
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output PDF path
        #[arg(short, long)]
        output: PathBuf,

        /// Directory for temporary files written during the merge
        #[arg(long)]
        temp_dir: Option<PathBuf>,

        /// Memory budget in MB before the engine throttles or switches
        /// strategy
        #[arg(long)]
        max_memory_mb: Option<u64>,

        /// Override the adaptively-chosen chunk size (number of inputs per
        /// chunk)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override the adaptively-chosen number of concurrent workers
        #[arg(long)]
        concurrent_workers: Option<usize>,

        /// Force the direct (non-streaming) merge path regardless of input
        /// size
        #[arg(long)]
        no_streaming: bool,

        /// Force the memory-optimized merge path regardless of input size
        #[arg(long)]
        optimize_memory: bool,
    },

    /// Validate a merge_engine.toml configuration file without running a job
    Validate {
        /// Configuration file to validate
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_merge_with_required_flags() {
        let cli = Cli::parse_from(["merge", "merge", "a.pdf", "b.pdf", "--output", "out.pdf"]);
        match cli.command {
            Commands::Merge { inputs, output, .. } => {
                assert_eq!(inputs, vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);
                assert_eq!(output, PathBuf::from("out.pdf"));
            }
            _ => panic!("expected Merge command"),
        }
    }

    #[test]
    fn parses_validate_command() {
        let cli = Cli::parse_from(["merge", "validate", "merge_engine.toml"]);
        match cli.command {
            Commands::Validate { config } => assert_eq!(config, PathBuf::from("merge_engine.toml")),
            _ => panic!("expected Validate command"),
        }
    }
}
