// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chunk/Batch Sizer
//!
//! Two pure functions turning a [`FileAnalysis`], the current memory
//! picture, and a [`StreamingConfig`] into a [`ChunkSize`]: `chunk_size` for
//! the concurrent and chunked-streaming paths, `batch_size` for the
//! memory-optimized path. Both always return a value clamped into their
//! respective bounds, so a caller never has to re-check the result.

use merge_domain::entities::{FileAnalysis, StreamingConfig};
use merge_domain::value_objects::ChunkSize;

const BATCH_MIN: usize = 2;
const BATCH_MAX: usize = 15;
const LARGE_AVG_BYTES: u64 = 5 * 1024 * 1024;

/// Documents per intermediate merge group for the concurrent and
/// chunked-streaming paths, clamped to `config.min_chunk_size ..=
/// config.max_chunk_size` (already the large-file-mode bounds if the caller
/// passed a config built from [`StreamingConfig::large_file_mode`]).
pub fn chunk_size(analysis: &FileAnalysis, available_memory: i64, max_memory: u64, config: &StreamingConfig) -> ChunkSize {
    let min = config.min_chunk_size;
    let max = config.max_chunk_size;
    let midpoint = (min + max) / 2;

    let estimate = if !config.enable_adaptive_chunking {
        midpoint
    } else if available_memory <= 0 {
        min
    } else if analysis.has_large_files {
        min + 1
    } else if max_memory > 0 && analysis.total_bytes > max_memory / 2 {
        midpoint
    } else if config.enable_memory_prediction && analysis.avg_bytes > 0 && max_memory > 0 {
        let mem_factor = available_memory as f64 / max_memory as f64;
        let size_factor = (config.large_file_threshold as f64 / analysis.avg_bytes as f64).min(2.0);
        let count_factor = (10.0 / analysis.count.max(1) as f64).clamp(0.5, 2.0);
        (max as f64 * mem_factor * size_factor * count_factor).round() as i64
    } else if analysis.avg_bytes > 0 {
        let per_document = (analysis.avg_bytes / 10).max(1);
        available_memory / per_document as i64
    } else {
        max as i64
    };

    ChunkSize::clamped(estimate.max(0) as usize, min, max)
}

/// Batch size for the memory-optimized path, clamped to the fixed `[2, 15]`
/// range independent of large-file mode (the memory-optimized path is
/// chosen precisely when pressure already justifies the tightest bounds, so
/// there is no separate large-file override here).
pub fn batch_size(analysis: &FileAnalysis, available_memory: i64, max_memory: u64) -> ChunkSize {
    let estimate = if available_memory <= 0 {
        BATCH_MIN
    } else if analysis.has_large_files {
        3
    } else if analysis.avg_bytes > LARGE_AVG_BYTES {
        4
    } else if max_memory > 0 && analysis.total_bytes > max_memory / 3 {
        5
    } else if analysis.avg_bytes > 0 {
        let per_document = (analysis.avg_bytes / 5).max(1);
        (available_memory / per_document as i64).max(0) as usize
    } else {
        8
    };

    ChunkSize::clamped(estimate, BATCH_MIN, BATCH_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(count: usize, avg_bytes: u64, has_large_files: bool) -> FileAnalysis {
        FileAnalysis {
            count,
            total_bytes: avg_bytes * count as u64,
            avg_bytes,
            min_bytes: avg_bytes,
            max_bytes: avg_bytes,
            has_large_files,
            large_file_count: if has_large_files { 1 } else { 0 },
        }
    }

    #[test]
    fn adaptive_disabled_returns_the_midpoint() {
        let mut config = StreamingConfig::default();
        config.enable_adaptive_chunking = false;
        let analysis = analysis(100, 1024, false);
        let size = chunk_size(&analysis, 1_000_000, 10_000_000, &config);
        assert_eq!(size.get(), (config.min_chunk_size + config.max_chunk_size) / 2);
    }

    #[test]
    fn no_available_memory_returns_the_minimum() {
        let config = StreamingConfig::default();
        let analysis = analysis(100, 1024, false);
        let size = chunk_size(&analysis, 0, 10_000_000, &config);
        assert_eq!(size.get(), config.min_chunk_size);
    }

    #[test]
    fn large_files_return_min_plus_one() {
        let config = StreamingConfig::default().large_file_mode();
        let analysis = analysis(10, 25 * 1024 * 1024, true);
        let size = chunk_size(&analysis, 1_000_000, 100_000_000, &config);
        assert_eq!(size.get(), config.min_chunk_size + 1);
    }

    #[test]
    fn total_bytes_over_half_max_memory_returns_the_midpoint() {
        let config = StreamingConfig::default();
        let analysis = analysis(10, 10_000_000, false);
        let size = chunk_size(&analysis, 1_000_000, 100_000_000, &config);
        assert_eq!(size.get(), (config.min_chunk_size + config.max_chunk_size) / 2);
    }

    #[test]
    fn memory_prediction_heuristic_stays_within_bounds() {
        let config = StreamingConfig::default();
        let analysis = analysis(5, 1024, false);
        let size = chunk_size(&analysis, 50_000_000, 500_000_000, &config);
        assert!(size.is_within(config.min_chunk_size, config.max_chunk_size));
    }

    #[test]
    fn result_is_always_clamped_to_configured_bounds() {
        let config = StreamingConfig::default();
        let analysis = analysis(1, 1, false);
        let size = chunk_size(&analysis, i64::MAX, 1, &config);
        assert!(size.is_within(config.min_chunk_size, config.max_chunk_size));
    }

    #[test]
    fn batch_size_no_memory_returns_two() {
        let analysis = analysis(10, 1024, false);
        assert_eq!(batch_size(&analysis, 0, 100_000_000).get(), 2);
    }

    #[test]
    fn batch_size_large_files_returns_three() {
        let analysis = analysis(10, 25 * 1024 * 1024, true);
        assert_eq!(batch_size(&analysis, 1_000_000, 100_000_000).get(), 3);
    }

    #[test]
    fn batch_size_large_average_returns_four() {
        let analysis = analysis(10, 6 * 1024 * 1024, false);
        assert_eq!(batch_size(&analysis, 1_000_000, 1_000_000_000).get(), 4);
    }

    #[test]
    fn batch_size_large_total_returns_five() {
        let analysis = analysis(10, 1024, false);
        let max_memory = 1000u64;
        let total = analysis.total_bytes;
        assert!(total > max_memory / 3);
        assert_eq!(batch_size(&analysis, 1_000_000, max_memory).get(), 5);
    }

    #[test]
    fn batch_size_falls_back_to_eight_with_no_average() {
        let analysis = analysis(0, 0, false);
        assert_eq!(batch_size(&analysis, 1_000_000, 100_000_000).get(), 8);
    }

    #[test]
    fn batch_size_is_always_clamped_to_two_and_fifteen() {
        let analysis = analysis(1, 1, false);
        let size = batch_size(&analysis, i64::MAX, 1);
        assert!(size.is_within(BATCH_MIN, BATCH_MAX));
    }

    proptest::proptest! {
        #[test]
        fn chunk_size_is_always_within_bounds(
            count in 0usize..500,
            avg_bytes in 0u64..200_000_000,
            has_large_files in proptest::bool::ANY,
            available in -10_000_000i64..2_000_000_000,
            max_memory in 0u64..2_000_000_000,
        ) {
            let analysis = analysis(count, avg_bytes, has_large_files);
            let config = if has_large_files { StreamingConfig::default().large_file_mode() } else { StreamingConfig::default() };
            let size = chunk_size(&analysis, available, max_memory, &config);
            prop_assert!(size.is_within(config.min_chunk_size, config.max_chunk_size));
        }

        #[test]
        fn batch_size_is_always_within_bounds(
            count in 0usize..500,
            avg_bytes in 0u64..200_000_000,
            has_large_files in proptest::bool::ANY,
            available in -10_000_000i64..2_000_000_000,
            max_memory in 0u64..2_000_000_000,
        ) {
            let analysis = analysis(count, avg_bytes, has_large_files);
            let size = batch_size(&analysis, available, max_memory);
            prop_assert!(size.is_within(BATCH_MIN, BATCH_MAX));
        }
    }
}
