// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Strategy Selector
//!
//! A pure function of `(FileAnalysis, MemoryPressure, StreamingConfig,
//! cpu_count)`. No filesystem access, no async, no shared state — this is
//! deliberate: it lets the four-way decision table be exercised by plain
//! unit tests and a `proptest` determinism check without spinning up a
//! runtime, keeping the pure decision logic separate from its orchestrator.
//!
//! Ties resolve in listed priority order: Direct, then Concurrent, then
//! Chunked streaming, then Memory-optimized. `select` checks them in that
//! order and returns on the first match.

use merge_domain::entities::{FileAnalysis, StreamingConfig};
use merge_domain::value_objects::{MemoryPressure, MergeStrategy};

const VERY_LARGE_FILE_BYTES: u64 = 20 * 1024 * 1024;
const CONCURRENT_SMALL_FILE_BYTES: u64 = 5 * 1024 * 1024;
const MEMORY_OPTIMIZED_AVG_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Chooses exactly one merge strategy for this job. Deterministic: the same
/// four inputs always yield the same output.
#[tracing::instrument(skip(config), fields(count = analysis.count, has_large_files = analysis.has_large_files))]
pub fn select(
    analysis: &FileAnalysis,
    pressure: MemoryPressure,
    config: &StreamingConfig,
    cpu_count: usize,
    allocated_bytes: u64,
    max_memory: u64,
) -> MergeStrategy {
    let strategy = if is_direct(analysis, pressure) {
        MergeStrategy::Direct
    } else if is_concurrent(analysis, pressure, config, cpu_count) {
        MergeStrategy::Concurrent
    } else if is_chunked_streaming(analysis, pressure, config) {
        MergeStrategy::ChunkedStreaming
    } else if is_memory_optimized(analysis, config, allocated_bytes, max_memory) {
        MergeStrategy::MemoryOptimized
    } else {
        // No rule matched explicitly: chunked streaming is the safe general
        // fallback (serialized, bounded, no assumption about file sizes).
        MergeStrategy::ChunkedStreaming
    };

    tracing::info!(%strategy, "strategy selected");
    strategy
}

fn is_direct(analysis: &FileAnalysis, pressure: MemoryPressure) -> bool {
    analysis.count <= 3 && !analysis.has_large_files && pressure == MemoryPressure::Normal
}

fn is_concurrent(analysis: &FileAnalysis, pressure: MemoryPressure, config: &StreamingConfig, cpu_count: usize) -> bool {
    if analysis.count < 4 || cpu_count < 2 || pressure.at_least_warning() {
        return false;
    }
    if analysis.large_file_count > config.max_concurrent_chunks {
        return false;
    }

    let small_batch = (4..=20).contains(&analysis.count) && !analysis.has_large_files;
    let many_small_files = analysis.count > 8 && analysis.avg_bytes < CONCURRENT_SMALL_FILE_BYTES;

    small_batch || many_small_files
}

fn is_chunked_streaming(analysis: &FileAnalysis, pressure: MemoryPressure, _config: &StreamingConfig) -> bool {
    analysis.count > 5 || pressure.at_least_warning() || analysis.max_bytes > VERY_LARGE_FILE_BYTES
}

fn is_memory_optimized(analysis: &FileAnalysis, config: &StreamingConfig, allocated_bytes: u64, max_memory: u64) -> bool {
    if max_memory == 0 {
        return false;
    }
    let allocation_ratio = allocated_bytes as f64 / max_memory as f64;
    let large_file_count_over_two = analysis.has_large_files && analysis.count > 2;

    allocation_ratio >= 0.60
        || analysis.count > 10
        || large_file_count_over_two
        || analysis.total_bytes > max_memory / 3
        || analysis.avg_bytes > MEMORY_OPTIMIZED_AVG_FILE_BYTES
}
