// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Merge Job
//!
//! A `MergeJob` is created per call to `merge_streaming` and destroyed on
//! return — it never outlives one invocation of the engine. Builder-style
//! chainable `with_*` setters keep the options/cancellation/progress
//! assembly readable at each call site.

use crate::cancellation::CancellationToken;
use crate::entities::ProgressObserver;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-call options controlling how a merge job executes.
#[derive(Debug, Clone)]
pub struct MergeJobOptions {
    pub max_memory: u64,
    pub temp_dir: PathBuf,
    pub chunk_size: Option<usize>,
    pub concurrent_workers: Option<usize>,
    pub use_streaming: bool,
    pub optimize_memory: bool,
}

impl Default for MergeJobOptions {
    fn default() -> Self {
        Self {
            max_memory: 512 * 1024 * 1024,
            temp_dir: std::env::temp_dir(),
            chunk_size: None,
            concurrent_workers: None,
            use_streaming: true,
            optimize_memory: false,
        }
    }
}

impl MergeJobOptions {
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = bytes;
        self
    }

    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_concurrent_workers(mut self, workers: usize) -> Self {
        self.concurrent_workers = Some(workers);
        self
    }
}

/// A single streaming-merge invocation: the ordered inputs, the desired
/// output, and the options/cancellation/progress triple that travels with it
/// through every phase.
///
/// Invariant: the order of `inputs` is preserved end-to-end into the output
/// document sequence, modulo inputs that fail validation and are skipped.
pub struct MergeJob {
    pub inputs: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub options: MergeJobOptions,
    pub cancellation: CancellationToken,
    pub progress: Option<Arc<dyn ProgressObserver>>,
}

impl MergeJob {
    pub fn new(inputs: Vec<PathBuf>, output_path: PathBuf) -> Self {
        Self {
            inputs,
            output_path,
            options: MergeJobOptions::default(),
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_options(mut self, options: MergeJobOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_use_streaming_and_leave_sizing_adaptive() {
        let options = MergeJobOptions::default();
        assert!(options.use_streaming);
        assert!(options.chunk_size.is_none());
        assert!(options.concurrent_workers.is_none());
    }

    #[test]
    fn builder_setters_compose() {
        let options = MergeJobOptions::default()
            .with_max_memory(64 * 1024 * 1024)
            .with_chunk_size(5)
            .with_concurrent_workers(2);

        assert_eq!(options.max_memory, 64 * 1024 * 1024);
        assert_eq!(options.chunk_size, Some(5));
        assert_eq!(options.concurrent_workers, Some(2));
    }

    #[test]
    fn job_preserves_input_order_as_supplied() {
        let inputs = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf"), PathBuf::from("c.pdf")];
        let job = MergeJob::new(inputs.clone(), PathBuf::from("out.pdf"));
        assert_eq!(job.inputs, inputs);
    }
}
