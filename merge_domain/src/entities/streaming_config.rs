// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Config
//!
//! Adaptive-sizing knobs consulted by the strategy selector, the chunk/batch
//! sizer, and the memory monitor. `large_file_mode()` returns a scoped
//! override clone rather than mutating shared state, so a job's large-file
//! tightening never leaks into a concurrently-constructed job on the same
//! engine instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub large_file_threshold: u64,
    pub very_large_file_threshold: u64,
    pub max_concurrent_chunks: usize,
    pub chunk_process_timeout: Duration,
    pub memory_warning_threshold: f64,
    pub memory_critical_threshold: f64,
    pub gc_interval: Duration,
    pub enable_adaptive_chunking: bool,
    pub enable_memory_prediction: bool,
    pub enable_progressive_gc: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 2,
            max_chunk_size: 20,
            large_file_threshold: 20 * 1024 * 1024,
            very_large_file_threshold: 20 * 1024 * 1024,
            max_concurrent_chunks: 4,
            chunk_process_timeout: Duration::from_secs(30),
            memory_warning_threshold: 0.70,
            memory_critical_threshold: 0.85,
            gc_interval: Duration::from_millis(500),
            enable_adaptive_chunking: true,
            enable_memory_prediction: true,
            enable_progressive_gc: false,
        }
    }
}

impl StreamingConfig {
    /// The per-job override applied when the workload analyzer reports
    /// `has_large_files`. Scoped to the returned clone; never mutates
    /// process-global state.
    pub fn large_file_mode(&self) -> Self {
        Self {
            min_chunk_size: 2,
            max_chunk_size: 5,
            max_concurrent_chunks: self.max_concurrent_chunks.min(2),
            memory_warning_threshold: 0.50,
            memory_critical_threshold: 0.65,
            gc_interval: Duration::from_millis(50),
            enable_progressive_gc: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_bounds() {
        let config = StreamingConfig::default();
        assert_eq!(config.min_chunk_size, 2);
        assert_eq!(config.max_chunk_size, 20);
        assert_eq!(config.memory_warning_threshold, 0.70);
        assert_eq!(config.memory_critical_threshold, 0.85);
    }

    #[test]
    fn large_file_mode_tightens_chunk_bounds_and_thresholds() {
        let overridden = StreamingConfig::default().large_file_mode();
        assert_eq!(overridden.min_chunk_size, 2);
        assert_eq!(overridden.max_chunk_size, 5);
        assert_eq!(overridden.max_concurrent_chunks, 2);
        assert_eq!(overridden.memory_warning_threshold, 0.50);
        assert_eq!(overridden.memory_critical_threshold, 0.65);
        assert!(overridden.enable_progressive_gc);
    }

    #[test]
    fn large_file_mode_never_increases_an_already_lower_concurrency_cap() {
        let mut config = StreamingConfig::default();
        config.max_concurrent_chunks = 1;
        let overridden = config.large_file_mode();
        assert_eq!(overridden.max_concurrent_chunks, 1);
    }
}
